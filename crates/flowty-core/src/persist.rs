use crate::flow::FlowGraph;
use std::fs;
use std::io;
use std::path::Path;

pub fn save_flow(flow: &FlowGraph, path: impl AsRef<Path>) -> io::Result<()> {
    let json = serde_json::to_string_pretty(flow)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;

    fs::write(path, json)?;
    Ok(())
}

pub fn load_flow(path: impl AsRef<Path>) -> io::Result<FlowGraph> {
    let json = fs::read_to_string(path)?;
    let flow: FlowGraph =
        serde_json::from_str(&json).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;

    // The file may have been edited by hand; re-validate the graph shape.
    FlowGraph::new(flow.name().to_string(), flow.instructions().to_vec())
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
}
