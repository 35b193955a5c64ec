use forkgate_consensus::{
    Block, BlockHash, BlockHeader, BlockIndex, BlockMeasure, BlockSizeEngine, ChainTipSnapshot,
    ChainView, ConsensusParams, DeploymentId, DeploymentStatus, EffectiveLimits,
    Transaction, TxIn, TxOut,
};
use serde::{Deserialize, Serialize};
use tracing::debug;
use tracing_subscriber::EnvFilter;

fn default_version() -> u32 {
    0x2000_0000
}

#[derive(Deserialize)]
struct HeaderSpec {
    time: u32,

    #[serde(default = "default_version")]
    version: u32,
}

#[derive(Deserialize)]
struct InputSpec {
    #[serde(default)]
    script_sig: String,

    #[serde(default)]
    witness: Vec<String>,
}

#[derive(Deserialize)]
struct OutputSpec {
    #[serde(default)]
    value: u64,

    #[serde(default)]
    script_pubkey: String,
}

#[derive(Deserialize)]
struct TxSpec {
    #[serde(default)]
    inputs: Vec<InputSpec>,

    #[serde(default)]
    outputs: Vec<OutputSpec>,
}

#[derive(Deserialize)]
struct Request {
    op: String,

    #[serde(default)]
    network: String,

    #[serde(default)]
    params: Option<ConsensusParams>,

    #[serde(default)]
    headers: Vec<HeaderSpec>,

    /// Defaults to the last header.
    #[serde(default)]
    tip_height: Option<u64>,

    #[serde(default)]
    deployment: Option<DeploymentId>,

    #[serde(default)]
    txs: Vec<TxSpec>,
}

#[derive(Debug, Default, Serialize)]
struct Response {
    ok: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    err: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    tip_height: Option<u64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    tip_hash: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    median_time_past: Option<u64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    regime: Option<&'static str>,

    #[serde(skip_serializing_if = "Option::is_none")]
    limits: Option<EffectiveLimits>,

    #[serde(skip_serializing_if = "Option::is_none")]
    state: Option<&'static str>,

    #[serde(skip_serializing_if = "Option::is_none")]
    status: Option<DeploymentStatus>,

    #[serde(skip_serializing_if = "Option::is_none")]
    measure: Option<BlockMeasure>,

    #[serde(skip_serializing_if = "Option::is_none")]
    violations: Option<Vec<&'static str>>,
}

fn fail(err: String) -> Response {
    Response {
        ok: false,
        err: Some(err),
        ..Response::default()
    }
}

fn engine_for(req: &Request) -> Result<BlockSizeEngine, String> {
    let params = match &req.params {
        Some(p) => p.clone(),
        None if req.network.is_empty() => ConsensusParams::regtest(),
        None => ConsensusParams::for_network(&req.network).map_err(|e| e.to_string())?,
    };
    BlockSizeEngine::new(params).map_err(|e| e.to_string())
}

fn build_chain(headers: &[HeaderSpec]) -> Result<BlockIndex, String> {
    let mut index = BlockIndex::new();
    let mut prev = BlockHash::ZERO;
    for (i, h) in headers.iter().enumerate() {
        let snap = index
            .connect(&BlockHeader {
                version: h.version,
                prev_block_hash: prev,
                merkle_root: [0u8; 32],
                time: h.time,
                bits: 0,
                nonce: i as u32,
            })
            .map_err(|e| e.to_string())?;
        prev = snap.hash;
    }
    Ok(index)
}

fn select_tip<'a>(index: &'a BlockIndex, height: Option<u64>) -> Result<&'a ChainTipSnapshot, String> {
    let best = index
        .best_chain_tip()
        .ok_or_else(|| "no headers".to_string())?;
    match height {
        None => Ok(best),
        Some(h) => index
            .ancestor(best, h)
            .ok_or_else(|| format!("tip_height {h} above chain height {}", best.height)),
    }
}

fn decode_hex(field: &str, s: &str) -> Result<Vec<u8>, String> {
    hex::decode(s).map_err(|e| format!("bad hex in {field}: {e}"))
}

fn build_block(parent: &ChainTipSnapshot, txs: &[TxSpec]) -> Result<Block, String> {
    let mut out = Vec::with_capacity(txs.len());
    for t in txs {
        let mut inputs = Vec::with_capacity(t.inputs.len());
        for i in &t.inputs {
            let mut witness = Vec::with_capacity(i.witness.len());
            for w in &i.witness {
                witness.push(decode_hex("witness", w)?);
            }
            inputs.push(TxIn {
                prevout: None,
                script_sig: decode_hex("script_sig", &i.script_sig)?,
                sequence: u32::MAX,
                witness,
            });
        }
        let mut outputs = Vec::with_capacity(t.outputs.len());
        for o in &t.outputs {
            outputs.push(TxOut {
                value: o.value,
                script_pubkey: decode_hex("script_pubkey", &o.script_pubkey)?,
            });
        }
        out.push(Transaction {
            version: 1,
            inputs,
            outputs,
            lock_time: 0,
        });
    }
    Ok(Block {
        header: BlockHeader {
            version: default_version(),
            prev_block_hash: parent.hash,
            merkle_root: [0u8; 32],
            time: u32::try_from(parent.time + 1)
                .map_err(|_| "block time past the header range".to_string())?,
            bits: 0,
            nonce: 0,
        },
        txs: out,
    })
}

fn run(req: &Request) -> Result<Response, String> {
    let engine = engine_for(req)?;
    let index = build_chain(&req.headers)?;
    let tip = select_tip(&index, req.tip_height)?;
    debug!(op = %req.op, network = %engine.params().network, tip_height = tip.height, "request");

    let mut resp = Response {
        ok: true,
        tip_height: Some(tip.height),
        tip_hash: Some(tip.hash.to_string()),
        median_time_past: Some(tip.median_time_past),
        ..Response::default()
    };

    match req.op.as_str() {
        "resolve_limits" => {
            let regime = engine.resolve_regime(&index, tip).map_err(|e| e.to_string())?;
            resp.regime = Some(regime.as_str());
            resp.limits = Some(engine.resolve_limits(&index, tip).map_err(|e| e.to_string())?);
        }
        "hard_fork_state" => {
            resp.state = Some(engine.hard_fork_state(tip).as_str());
        }
        "fork_state" => {
            let id = req.deployment.unwrap_or(DeploymentId::SegwitAndLargerBlocks);
            let state = engine.get_state(&index, id, tip).map_err(|e| e.to_string())?;
            resp.state = Some(state.as_str());
        }
        "deployment_status" => {
            let id = req.deployment.unwrap_or(DeploymentId::SegwitAndLargerBlocks);
            let status = engine
                .deployment_status(&index, id, tip)
                .map_err(|e| e.to_string())?;
            resp.state = Some(status.state.as_str());
            resp.status = Some(status);
        }
        "validate_size" => {
            let block = build_block(tip, &req.txs)?;
            let (measure, report) = engine
                .check_size(&index, &block, tip)
                .map_err(|e| e.to_string())?;
            resp.limits = Some(engine.resolve_limits(&index, tip).map_err(|e| e.to_string())?);
            resp.measure = Some(measure);
            if let Err(v) = report.clone().into_result() {
                resp.ok = false;
                resp.err = Some(v.as_str().to_string());
            }
            resp.violations = Some(report.violations.iter().map(|v| v.as_str()).collect());
        }
        other => return Err(format!("unknown op: {other}")),
    }
    Ok(resp)
}

fn main() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let resp = match serde_json::from_reader::<_, Request>(std::io::stdin()) {
        Ok(req) => run(&req).unwrap_or_else(fail),
        Err(e) => fail(format!("bad request: {e}")),
    };
    let _ = serde_json::to_writer(std::io::stdout(), &resp);
}
