use xdm::simple::SimpleXml;
use xpath::{Parser1, Sequence};

fn select(xml: &str, expr: &str) -> (xdm::Tree, Sequence) {
    let doc = SimpleXml::parse(xml);
    let selector = Parser1::new().parse(expr).expect("parses");
    selector.select(doc.root()).expect("evaluates")
}

fn names(tree: &xdm::Tree, seq: &Sequence) -> Vec<String> {
    seq.iter()
        .map(|item| match item {
            xpath::Item::Node(id) => tree.name(*id).map(|n| n.local.to_string()).unwrap_or_default(),
            xpath::Item::Atomic(a) => a.as_string(),
        })
        .collect()
}

#[test]
fn scenario_1_child_step_lists_in_document_order() {
    let (tree, seq) = select("<A><B1/><B2><C1/><C2/><C3/></B2></A>", "/A/B2/*");
    assert_eq!(names(&tree, &seq), vec!["C1", "C2", "C3"]);
}

#[test]
fn scenario_2_descendant_shorthand_finds_one_node() {
    let (tree, seq) = select("<A><B1/><B2><C1/><C2/><C3/></B2></A>", "//C2");
    assert_eq!(names(&tree, &seq), vec!["C2"]);
}

#[test]
fn scenario_3_predicate_compares_attribute_numerically() {
    let (tree, seq) = select(r#"<r><x a="10"/><x a="20"/></r>"#, "/r/x[@a>15]/@a");
    let vals: Vec<String> = seq.iter().map(|it| it.string_value(Some(&tree)).unwrap_or_default()).collect();
    assert_eq!(vals, vec!["20"]);
}

#[test]
fn scenario_4_count_of_siblings() {
    let (_tree, seq) = select("<r><x/><x/><x/></r>", "count(/r/x)");
    match &seq.iter().next().unwrap() {
        xpath::Item::Atomic(a) => assert_eq!(a.as_string(), "3"),
        _ => panic!("expected an atomic count"),
    }
}

#[test]
fn scenario_5_concat_needs_no_context() {
    let selector = Parser1::new().parse(r#"concat("foo", " ", "bar")"#).expect("parses");
    let doc = SimpleXml::parse("<x/>");
    let (_tree, seq) = selector.select(doc.root()).expect("evaluates without real context use");
    match seq.iter().next().unwrap() {
        xpath::Item::Atomic(a) => assert_eq!(a.as_string(), "foo bar"),
        _ => panic!("expected a string"),
    }
}

#[test]
fn scenario_6_arithmetic_rejects_string_operand_at_parse_time() {
    let err = Parser1::new().parse(r#"1 + "1""#).expect_err("must fail statically");
    assert_eq!(err.code(), xpath::ErrorCode::XPTY0004);
}

#[test]
fn scenario_7_last_predicate_selects_final_sibling() {
    let (tree, seq) = select("<r><a/><b/><c/></r>", "/r/*[last()]");
    assert_eq!(names(&tree, &seq), vec!["c"]);
}

#[test]
fn scenario_8_for_expression_names_each_child() {
    let (_tree, seq) = select("<r><a/><b/></r>", "for $x in /r/* return name($x)");
    let vals: Vec<String> = seq.iter().map(|it| it.string_value(None).unwrap_or_default()).collect();
    assert_eq!(vals, vec!["a", "b"]);
}

#[test]
fn invariant_document_order_has_no_duplicates_and_is_increasing() {
    let (tree, seq) = select("<A><B1/><B2><C1/><C2/></B2></A>", "//*|//*");
    let positions: Vec<u32> = seq
        .iter()
        .map(|it| match it {
            xpath::Item::Node(id) => tree.position(*id),
            _ => unreachable!(),
        })
        .collect();
    let mut sorted = positions.clone();
    sorted.sort();
    sorted.dedup();
    assert_eq!(positions, sorted, "union of a sequence with itself must still be duplicate-free and ordered");
}

#[test]
fn invariant_axis_self_test_child_then_parent_round_trips() {
    let doc = SimpleXml::parse("<A><B/></A>");
    let tree = xdm::build::build_node_tree(doc.root()).unwrap();
    let a = tree.children(tree.root())[0];
    let b = tree.children(a)[0];
    let back = xdm::axis::parent(&tree, b);
    assert_eq!(back, vec![a]);
}

#[test]
fn invariant_predicate_numeric_law_matches_position_equality() {
    let (tree1, seq1) = select("<r><a/><b/><c/></r>", "/r/*[2]");
    let (tree2, seq2) = select("<r><a/><b/><c/></r>", "/r/*[position()=2]");
    assert_eq!(names(&tree1, &seq1), names(&tree2, &seq2));
}

#[test]
fn invariant_ebv_is_pure_over_the_result_sequence() {
    let empty = Sequence::empty();
    assert_eq!(empty.effective_boolean_value().unwrap(), false);

    let single_string = Sequence::atomic(xpath::Atomic::String(String::new()));
    assert_eq!(single_string.effective_boolean_value().unwrap(), false);

    let single_number = Sequence::atomic(xpath::Atomic::Integer(0));
    assert_eq!(single_number.effective_boolean_value().unwrap(), false);
}
