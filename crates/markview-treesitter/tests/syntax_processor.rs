use markview_core::{TextBuffer, TokenResolver};
use markview_treesitter::{SyntaxProcessor, UpdateMode};
use tree_sitter_javascript::LANGUAGE;

fn processor() -> SyntaxProcessor {
    SyntaxProcessor::new(LANGUAGE.into()).unwrap()
}

#[test]
fn test_first_process_is_an_initial_parse() {
    let buffer = TextBuffer::new(include_str!("fixtures/sample.js"));
    let mut processor = processor();
    assert!(!processor.parse_available());

    assert_eq!(processor.process(&buffer, None), UpdateMode::Initial);
    assert_eq!(processor.last_update_mode(), UpdateMode::Initial);
    assert!(processor.parse_available());
    assert_eq!(processor.line_count(), buffer.line_count());
    assert_eq!(processor.tree().unwrap().root_node().kind(), "program");
}

#[test]
fn test_transaction_updates_incrementally() {
    let mut buffer = TextBuffer::new(include_str!("fixtures/sample.js"));
    let mut processor = processor();
    processor.process(&buffer, None);

    let tx = buffer.insert(0, "// header\n");
    assert_eq!(processor.process(&buffer, Some(&tx)), UpdateMode::Incremental);
    assert_eq!(processor.text(), buffer.text());

    let root = processor.tree().unwrap().root_node();
    assert_eq!(root.end_byte(), processor.text().len());
    assert!(!root.has_error());
}

#[test]
fn test_incremental_edit_after_multibyte_text() {
    let mut buffer = TextBuffer::new("const s = \"héllo wörld\";\nlet n = 0;\n");
    let mut processor = processor();
    processor.process(&buffer, None);

    // Replace `0` with `1 + 2`; the edit sits past two multibyte chars.
    let start = buffer.text().chars().count() - 3;
    let tx = buffer.replace(start, start + 1, "1 + 2");
    assert_eq!(processor.process(&buffer, Some(&tx)), UpdateMode::Incremental);
    assert_eq!(processor.text(), buffer.text());
    assert!(!processor.tree().unwrap().root_node().has_error());
}

#[test]
fn test_mismatching_transaction_falls_back_to_full_reparse() {
    let buffer = TextBuffer::new("let a = 1;\n");
    let mut processor = processor();
    processor.process(&buffer, None);

    // A transaction recorded against a different document.
    let mut other = TextBuffer::new("function unrelated() { return 42; }\n");
    let stale = other.insert(0, "// x\n");

    assert_eq!(processor.process(&buffer, Some(&stale)), UpdateMode::FullReparse);
    assert_eq!(processor.text(), buffer.text());
    assert!(!processor.tree().unwrap().root_node().has_error());
}

#[test]
fn test_process_without_transaction_resyncs() {
    let buffer = TextBuffer::new("let a = 1;\n");
    let mut processor = processor();
    processor.process(&buffer, None);

    let replaced = TextBuffer::new("let b = 2;\n");
    assert_eq!(processor.process(&replaced, None), UpdateMode::FullReparse);
    assert_eq!(processor.text(), replaced.text());
}

#[test]
fn test_force_parse_resyncs_a_stale_mirror() {
    let mut buffer = TextBuffer::new("let a = 1;\n");
    let mut processor = processor();
    processor.process(&buffer, None);

    // Mutate the buffer behind the processor's back.
    buffer.insert(0, "let z = 9;\n");
    assert!(processor.force_parse(&buffer, buffer.len_chars()));
    assert_eq!(processor.text(), buffer.text());
    assert_eq!(processor.last_update_mode(), UpdateMode::FullReparse);
}

#[test]
fn test_token_at_resolves_the_innermost_token() {
    let buffer = TextBuffer::new("const value = 10;\n");
    let mut processor = processor();
    processor.process(&buffer, None);

    // Offset 0 sits on the `const` keyword token.
    let token = processor.token_at(0).unwrap();
    assert_eq!((token.from, token.to), (0, 5));

    // Offset 6 sits on the identifier `value`.
    let token = processor.token_at(6).unwrap();
    assert_eq!(buffer.slice(token.from, token.to), "value");
}

#[test]
fn test_token_at_includes_punctuation_tokens() {
    let buffer = TextBuffer::new("obj = { a: 1 };\n");
    let mut processor = processor();
    processor.process(&buffer, None);

    let token = processor.token_at(6).unwrap();
    assert_eq!(buffer.slice(token.from, token.to), "{");
}
