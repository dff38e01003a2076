use anyhow::Result;
use colored::Colorize;
use flowty_core::{FlowGraph, InstrIndex, Instruction, NarrowedTypes};
use serde_json::json;

/// One narrowing answer, ready to print.
pub struct NarrowingReport<'a> {
    flow: &'a FlowGraph,
    usage: InstrIndex,
    result: &'a NarrowedTypes,
}

impl<'a> NarrowingReport<'a> {
    pub fn new(flow: &'a FlowGraph, usage: InstrIndex, result: &'a NarrowedTypes) -> Self {
        Self { flow, usage, result }
    }

    fn occurrence_text(&self) -> Option<String> {
        match self.flow.get(self.usage) {
            Some(Instruction::Push { expr }) => Some(expr.to_string()),
            _ => None,
        }
    }

    pub fn to_human(&self, use_colors: bool) -> String {
        let occurrence = self
            .occurrence_text()
            .unwrap_or_else(|| "<not an occurrence>".to_string());

        let mut out = String::new();
        let header = format!(
            "flow `{}`, occurrence `{}` at {}:",
            self.flow.name(),
            occurrence,
            self.usage
        );
        if use_colors {
            out.push_str(&header.bold().to_string());
        } else {
            out.push_str(&header);
        }
        out.push('\n');

        if self.result.is_empty() {
            let notice = "  (no type facts hold on every path)";
            if use_colors {
                out.push_str(&notice.yellow().to_string());
            } else {
                out.push_str(notice);
            }
            out.push('\n');
            return out;
        }

        for (subject, ty) in self.result.iter() {
            let line = if use_colors {
                format!("  {}: {}", subject.to_string().cyan(), ty.to_string().green())
            } else {
                format!("  {}: {}", subject, ty)
            };
            out.push_str(&line);
            out.push('\n');
        }
        out
    }

    pub fn to_json(&self) -> serde_json::Value {
        let narrowed: Vec<serde_json::Value> = self
            .result
            .iter()
            .map(|(subject, ty)| {
                json!({
                    "expression": subject.to_string(),
                    "type": ty.to_string(),
                })
            })
            .collect();

        json!({
            "flow": self.flow.name(),
            "occurrence": {
                "index": self.usage.index(),
                "expression": self.occurrence_text(),
            },
            "narrowed": narrowed,
        })
    }

    pub fn to_json_string(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.to_json())?)
    }
}
