use super::*;

#[test]
fn buffer_handler_captures_lines() {
    let handler = BufferPrintHandler::new();
    handler.println("hello");
    handler.println("world");
    assert_eq!(handler.get_output(), "hello\nworld\n");
}

#[test]
fn buffer_handler_clear_empties_buffer() {
    let handler = buffer_handler();
    handler.println("hello");
    assert!(!handler.get_output().is_empty());
    handler.clear();
    assert!(handler.get_output().is_empty());
}

#[test]
fn silent_handler_discards() {
    let handler = silent_handler();
    handler.println("nothing");
    assert_eq!(handler.get_output(), "");
}

#[test]
fn stdout_handler_get_output_returns_empty() {
    let handler = stdout_handler();
    assert_eq!(handler.get_output(), "");
}
