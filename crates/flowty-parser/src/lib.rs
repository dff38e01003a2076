/*! Parse the `.flow` text format into flow graphs.
 *
 * Flows written as text are the easiest way to pin down an engine behavior:
 * they go in version control, round-trip through the emitter, and feed both
 * the CLI and the test suites. Branch targets may be labels or raw indices.
 */

use flowty_core::{Expr, FlowError, FlowGraph, InstrIndex, Instruction, Type};
use pest::iterators::Pair;
use pest::Parser;
use pest_derive::Parser;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use thiserror::Error;
use walkdir::WalkDir;

#[derive(Parser)]
#[grammar = "grammar.pest"]
pub struct FlowParser;

#[derive(Error, Debug)]
pub enum ParseError {
    #[error("syntax error: {0}")]
    Syntax(#[from] Box<pest::error::Error<Rule>>),
    #[error("unknown label `{label}` in flow `{flow}`")]
    UnknownLabel { flow: String, label: String },
    #[error(transparent)]
    Invalid(#[from] FlowError),
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

pub type ParseResult<T> = Result<T, ParseError>;

pub fn parse(input: &str) -> ParseResult<Vec<FlowGraph>> {
    let mut pairs = FlowParser::parse(Rule::file, input).map_err(Box::new)?;
    let file = pairs.next().expect("file rule always produces one pair");

    let mut flows = Vec::new();
    for pair in file.into_inner() {
        if pair.as_rule() == Rule::flow {
            flows.push(lower_flow(pair)?);
        }
    }
    Ok(flows)
}

/// Parses input expected to contain exactly one flow.
pub fn parse_flow(input: &str) -> ParseResult<FlowGraph> {
    let mut flows = parse(input)?;
    match flows.len() {
        1 => Ok(flows.remove(0)),
        n => Err(FlowError::MalformedFlow(format!("expected one flow, found {}", n)).into()),
    }
}

pub fn parse_expr(input: &str) -> ParseResult<Expr> {
    let mut pairs = FlowParser::parse(Rule::expr_input, input).map_err(Box::new)?;
    let wrapper = pairs.next().expect("expr_input always produces one pair");
    let expr = wrapper
        .into_inner()
        .next()
        .expect("expr_input always wraps an expr");
    Ok(lower_expr(expr))
}

pub fn parse_type(input: &str) -> ParseResult<Type> {
    let mut pairs = FlowParser::parse(Rule::type_input, input).map_err(Box::new)?;
    let wrapper = pairs.next().expect("type_input always produces one pair");
    let ty = wrapper
        .into_inner()
        .next()
        .expect("type_input always wraps a ty");
    Ok(lower_type(ty))
}

pub fn check(input: &str) -> bool {
    parse(input).is_ok()
}

pub fn parse_path(path: impl AsRef<Path>) -> ParseResult<Vec<FlowGraph>> {
    let path = path.as_ref();
    let input = std::fs::read_to_string(path).map_err(|source| ParseError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse(&input)
}

/// Parses every `.flow` file under `dir`, in path order.
pub fn parse_dir(dir: impl AsRef<Path>) -> ParseResult<Vec<FlowGraph>> {
    let mut paths: Vec<PathBuf> = WalkDir::new(dir)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
        .filter(|path| path.extension().is_some_and(|ext| ext == "flow"))
        .collect();
    paths.sort();

    let mut flows = Vec::new();
    for path in paths {
        flows.extend(parse_path(&path)?);
    }
    Ok(flows)
}

fn lower_flow(pair: Pair<Rule>) -> ParseResult<FlowGraph> {
    let mut inner = pair.into_inner();
    let name = inner
        .next()
        .expect("flow rule starts with its name")
        .as_str()
        .to_string();

    let mut instructions: Vec<Instruction> = Vec::new();
    let mut labels: HashMap<String, InstrIndex> = HashMap::new();
    let mut pending: Vec<(usize, String)> = Vec::new();

    for stmt in inner {
        let stmt = stmt
            .into_inner()
            .next()
            .expect("stmt wraps a label or an instruction");
        match stmt.as_rule() {
            Rule::label_def => {
                let label = stmt
                    .into_inner()
                    .next()
                    .expect("label_def wraps its name")
                    .as_str()
                    .to_string();
                labels.insert(label, InstrIndex(instructions.len() as u32));
            }
            Rule::instruction => {
                let slot = instructions.len();
                instructions.push(lower_instruction(stmt, slot, &mut pending));
            }
            other => unreachable!("unexpected rule in flow body: {:?}", other),
        }
    }

    for (slot, label) in pending {
        let target = *labels.get(&label).ok_or_else(|| ParseError::UnknownLabel {
            flow: name.clone(),
            label,
        })?;
        match &mut instructions[slot] {
            Instruction::Goto { target: t } | Instruction::CondGoto { target: t, .. } => {
                *t = target;
            }
            other => unreachable!("pending label on a non-branch: {:?}", other),
        }
    }

    Ok(FlowGraph::new(name, instructions)?)
}

fn first_inner(pair: Pair<'_, Rule>) -> Pair<'_, Rule> {
    pair.into_inner()
        .next()
        .expect("rule always wraps an inner pair")
}

fn lower_instruction(
    pair: Pair<Rule>,
    slot: usize,
    pending: &mut Vec<(usize, String)>,
) -> Instruction {
    let instr = pair
        .into_inner()
        .next()
        .expect("instruction wraps one variant");
    let rule = instr.as_rule();
    match rule {
        Rule::push_instr => {
            let expr = lower_expr(first_inner(instr));
            Instruction::Push { expr: expr.into() }
        }
        Rule::push_type_instr => Instruction::PushType {
            ty: lower_type(first_inner(instr)),
        },
        Rule::push_bool_instr => Instruction::PushBool {
            value: first_inner(instr).as_str() == "true",
        },
        Rule::instanceof_instr => Instruction::InstanceOf,
        Rule::not_instr => Instruction::Not,
        Rule::cast_instr => {
            let mut inner = instr.into_inner();
            let expr = lower_expr(inner.next().expect("cast has an expression"));
            let ty = lower_type(inner.next().expect("cast has a type"));
            Instruction::Cast {
                expr: expr.into(),
                ty,
            }
        }
        Rule::dup_instr => Instruction::Dup,
        Rule::pop_instr => Instruction::Pop,
        Rule::goto_instr | Rule::iftrue_instr | Rule::iffalse_instr => {
            let target = lower_target(first_inner(instr), slot, pending);
            match rule {
                Rule::goto_instr => Instruction::Goto { target },
                Rule::iftrue_instr => Instruction::CondGoto {
                    target,
                    jump_if: true,
                },
                _ => Instruction::CondGoto {
                    target,
                    jump_if: false,
                },
            }
        }
        Rule::finish_instr => Instruction::Finish,
        other => unreachable!("unexpected instruction rule: {:?}", other),
    }
}

fn lower_target(pair: Pair<Rule>, slot: usize, pending: &mut Vec<(usize, String)>) -> InstrIndex {
    let target = pair.into_inner().next().expect("target wraps its form");
    match target.as_rule() {
        // An index too large for u32 can't be a real target; leave it out of
        // range and let graph validation reject it.
        Rule::index => InstrIndex(target.as_str().parse().unwrap_or(u32::MAX)),
        Rule::label_name => {
            pending.push((slot, target.as_str().to_string()));
            InstrIndex(u32::MAX)
        }
        other => unreachable!("unexpected target rule: {:?}", other),
    }
}

fn lower_expr(pair: Pair<Rule>) -> Expr {
    let mut inner = pair.into_inner();
    let mut expr = lower_primary(inner.next().expect("expr starts with a primary"));
    for postfix in inner {
        let op = postfix.into_inner().next().expect("postfix wraps one form");
        match op.as_rule() {
            Rule::field_access => {
                let name = op.into_inner().next().expect("field has a name").as_str();
                expr = Expr::field(expr, name);
            }
            Rule::index_access => {
                let index = lower_expr(op.into_inner().next().expect("index has an expression"));
                expr = Expr::index(expr, index);
            }
            Rule::call_args => {
                let args = op.into_inner().map(lower_expr).collect();
                expr = Expr::call(expr, args);
            }
            other => unreachable!("unexpected postfix rule: {:?}", other),
        }
    }
    expr
}

fn lower_primary(pair: Pair<Rule>) -> Expr {
    let offset = pair.as_span().start() as u32;
    let inner = pair.into_inner().next().expect("primary wraps one form");
    match inner.as_rule() {
        Rule::ident => Expr::ident(inner.as_str()).at(offset),
        Rule::literal => Expr::literal(inner.as_str()).at(offset),
        Rule::expr => lower_expr(inner),
        other => unreachable!("unexpected primary rule: {:?}", other),
    }
}

fn lower_type(pair: Pair<Rule>) -> Type {
    let mut inner = pair.into_inner();
    let name = inner.next().expect("ty starts with a name").as_str();
    let mut ty = Type::named(name);
    for _suffix in inner {
        ty = Type::array(ty);
    }
    ty
}
