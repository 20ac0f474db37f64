//! Control flow signals

/// Control flow state
///
/// Returned by every statement. Anything other than `None` unwinds enclosing
/// blocks until a loop (`Break` / `Continue`) or the program root (`Return`) handles it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Control {
    None,
    Break,
    Continue,
    Return,
}
