use crate::analysis::narrow::narrowed_types_at;
use crate::builder::FlowBuilder;
use crate::expr::Expr;
use crate::flow::InstrIndex;
use crate::types::Type;
use pretty_assertions::assert_eq;

fn x() -> Expr {
    Expr::ident("x")
}

#[test]
fn test_instance_test_narrows_the_true_branch_only() {
    // if (x instanceof String) { <x> } else { <x> }
    let mut b = FlowBuilder::new("branch_asymmetry");
    let else_branch = b.new_label();
    let end = b.new_label();

    b.instanceof_test(x(), Type::named("String"));
    b.goto_if_false(else_branch);
    let usage_then = b.push(x());
    b.pop();
    b.goto(end);
    b.bind(else_branch);
    let usage_else = b.push(x());
    b.pop();
    b.bind(end);
    b.finish();
    let flow = b.build().unwrap();

    let then_result = narrowed_types_at(&flow, InstrIndex(0), usage_then);
    assert_eq!(then_result.get(&x().into()), Some(&Type::named("String")));

    let else_result = narrowed_types_at(&flow, InstrIndex(0), usage_else);
    assert!(else_result.is_empty());
}

#[test]
fn test_negated_instance_test_narrows_the_else_branch() {
    // if (!(x instanceof String)) { <x> } else { <x> }
    let mut b = FlowBuilder::new("negated_test");
    let else_branch = b.new_label();
    let end = b.new_label();

    b.instanceof_test(x(), Type::named("String"));
    b.not();
    b.goto_if_false(else_branch);
    let usage_then = b.push(x());
    b.pop();
    b.goto(end);
    b.bind(else_branch);
    let usage_else = b.push(x());
    b.pop();
    b.bind(end);
    b.finish();
    let flow = b.build().unwrap();

    assert!(narrowed_types_at(&flow, InstrIndex(0), usage_then).is_empty());
    assert_eq!(
        narrowed_types_at(&flow, InstrIndex(0), usage_else).get(&x().into()),
        Some(&Type::named("String"))
    );
}

#[test]
fn test_duplicated_test_value_behaves_like_the_original() {
    // The test result is duplicated, branched on once, and discarded once;
    // only the branch application narrows.
    let mut b = FlowBuilder::new("dup_condition");
    let else_branch = b.new_label();
    let end = b.new_label();

    b.instanceof_test(x(), Type::named("String"));
    b.dup();
    b.goto_if_false(else_branch);
    b.pop();
    let usage_then = b.push(x());
    b.pop();
    b.goto(end);
    b.bind(else_branch);
    b.pop();
    let usage_else = b.push(x());
    b.pop();
    b.bind(end);
    b.finish();
    let flow = b.build().unwrap();

    assert_eq!(
        narrowed_types_at(&flow, InstrIndex(0), usage_then).get(&x().into()),
        Some(&Type::named("String"))
    );
    assert!(narrowed_types_at(&flow, InstrIndex(0), usage_else).is_empty());
}

#[test]
fn test_cast_narrows_unconditionally() {
    // ((String) x); <x>
    let mut b = FlowBuilder::new("cast_dominance");
    b.cast(x(), Type::named("String"));
    let usage = b.push(x());
    b.pop();
    b.finish();
    let flow = b.build().unwrap();

    let result = narrowed_types_at(&flow, InstrIndex(0), usage);
    assert_eq!(result.get(&x().into()), Some(&Type::named("String")));
}

#[test]
fn test_agreeing_branches_survive_the_merge() {
    // if (cond) { (String) x } else { (String) x } <x>
    let mut b = FlowBuilder::new("merge_agreement");
    let else_branch = b.new_label();
    let merge = b.new_label();

    b.push(Expr::ident("cond"));
    b.goto_if_false(else_branch);
    b.cast(x(), Type::named("String"));
    b.goto(merge);
    b.bind(else_branch);
    b.cast(x(), Type::named("String"));
    b.bind(merge);
    let usage = b.push(x());
    b.pop();
    b.finish();
    let flow = b.build().unwrap();

    let result = narrowed_types_at(&flow, InstrIndex(0), usage);
    assert_eq!(result.get(&x().into()), Some(&Type::named("String")));
}

#[test]
fn test_disagreeing_branches_cancel_at_the_merge() {
    // if (cond) { (A) x; (T) y } else { (T) y } <x>
    let mut b = FlowBuilder::new("merge_conflict");
    let else_branch = b.new_label();
    let merge = b.new_label();

    b.push(Expr::ident("cond"));
    b.goto_if_false(else_branch);
    b.cast(x(), Type::named("A"));
    b.cast(Expr::ident("y"), Type::named("T"));
    b.goto(merge);
    b.bind(else_branch);
    b.cast(Expr::ident("y"), Type::named("T"));
    b.bind(merge);
    let usage = b.push(x());
    b.pop();
    b.finish();
    let flow = b.build().unwrap();

    let result = narrowed_types_at(&flow, InstrIndex(0), usage);
    assert_eq!(result.get(&x().into()), None);
    assert_eq!(
        result.get(&Expr::ident("y").into()),
        Some(&Type::named("T"))
    );
    assert_eq!(result.len(), 1);
}

#[test]
fn test_sibling_branches_stay_isolated() {
    // if (cond) { (A) x; <x> } else { (B) x; <x> }
    let mut b = FlowBuilder::new("isolation");
    let else_branch = b.new_label();
    let end = b.new_label();

    b.push(Expr::ident("cond"));
    b.goto_if_false(else_branch);
    b.cast(x(), Type::named("A"));
    let usage_then = b.push(x());
    b.pop();
    b.goto(end);
    b.bind(else_branch);
    b.cast(x(), Type::named("B"));
    let usage_else = b.push(x());
    b.pop();
    b.bind(end);
    b.finish();
    let flow = b.build().unwrap();

    assert_eq!(
        narrowed_types_at(&flow, InstrIndex(0), usage_then).get(&x().into()),
        Some(&Type::named("A"))
    );
    assert_eq!(
        narrowed_types_at(&flow, InstrIndex(0), usage_else).get(&x().into()),
        Some(&Type::named("B"))
    );
}

#[test]
fn test_loop_body_narrowing_terminates_and_holds() {
    // while (x instanceof Item) { <x> }
    let mut b = FlowBuilder::new("loop");
    let header = b.new_label();
    let exit = b.new_label();

    b.bind(header);
    b.instanceof_test(x(), Type::named("Item"));
    b.goto_if_false(exit);
    let usage = b.push(x());
    b.pop();
    b.goto(header);
    b.bind(exit);
    b.finish();
    let flow = b.build().unwrap();

    let result = narrowed_types_at(&flow, InstrIndex(0), usage);
    assert_eq!(result.get(&x().into()), Some(&Type::named("Item")));
}

#[test]
fn test_unreachable_usage_reports_nothing() {
    let mut b = FlowBuilder::new("unreachable");
    let end = b.new_label();

    b.goto(end);
    let usage = b.push(x());
    b.pop();
    b.bind(end);
    b.finish();
    let flow = b.build().unwrap();

    assert!(narrowed_types_at(&flow, InstrIndex(0), usage).is_empty());
}

#[test]
fn test_constant_false_condition_prunes_its_branch() {
    // if (false) { (A) x; <x> }  — the then branch is never feasible.
    let mut b = FlowBuilder::new("pruned_branch");
    let end = b.new_label();

    b.push_bool(false);
    b.goto_if_false(end);
    b.cast(x(), Type::named("A"));
    let usage = b.push(x());
    b.pop();
    b.bind(end);
    b.finish();
    let flow = b.build().unwrap();

    assert!(narrowed_types_at(&flow, InstrIndex(0), usage).is_empty());
}

#[test]
fn test_later_cast_overwrites_earlier_fact() {
    // ((A) x); ((B) x); <x>
    let mut b = FlowBuilder::new("last_write");
    b.cast(x(), Type::named("A"));
    b.cast(x(), Type::named("B"));
    let usage = b.push(x());
    b.pop();
    b.finish();
    let flow = b.build().unwrap();

    let result = narrowed_types_at(&flow, InstrIndex(0), usage);
    assert_eq!(result.get(&x().into()), Some(&Type::named("B")));
    assert_eq!(result.len(), 1);
}

#[test]
fn test_field_subjects_match_structurally() {
    // ((Config) this.settings); <this.settings>   — fresh nodes each time.
    let subject = || Expr::field(Expr::ident("this"), "settings");

    let mut b = FlowBuilder::new("field_subject");
    b.cast(subject().at(10), Type::named("Config"));
    let usage = b.push(subject().at(40));
    b.pop();
    b.finish();
    let flow = b.build().unwrap();

    let result = narrowed_types_at(&flow, InstrIndex(0), usage);
    assert_eq!(result.get(&subject().into()), Some(&Type::named("Config")));
}

#[test]
fn test_results_are_ordered_by_source_offset() {
    let mut b = FlowBuilder::new("ordering");
    b.cast(Expr::ident("b").at(30), Type::named("B"));
    b.cast(Expr::ident("a").at(10), Type::named("A"));
    let usage = b.push(Expr::ident("a").at(10));
    b.pop();
    b.finish();
    let flow = b.build().unwrap();

    let result = narrowed_types_at(&flow, InstrIndex(0), usage);
    let rendered: Vec<String> = result
        .iter()
        .map(|(subject, ty)| format!("{}: {}", subject, ty))
        .collect();
    assert_eq!(rendered, vec!["a: A".to_string(), "b: B".to_string()]);
}

#[test]
fn test_repeated_runs_are_identical() {
    let mut b = FlowBuilder::new("determinism");
    let else_branch = b.new_label();
    let merge = b.new_label();

    b.instanceof_test(x(), Type::named("String"));
    b.goto_if_false(else_branch);
    b.cast(Expr::ident("y").at(5), Type::named("T"));
    b.goto(merge);
    b.bind(else_branch);
    b.cast(Expr::ident("y").at(5), Type::named("T"));
    b.cast(x(), Type::named("String"));
    b.bind(merge);
    let usage = b.push(x());
    b.pop();
    b.finish();
    let flow = b.build().unwrap();

    let first = narrowed_types_at(&flow, InstrIndex(0), usage);
    for _ in 0..10 {
        assert_eq!(narrowed_types_at(&flow, InstrIndex(0), usage), first);
    }
}
