//! Process-wide monotonic counters underlying `gensym` and `syntax-quote`
//! hygienic ids. Atomics rather than a plain `Cell` so that a host exposing
//! one interpreter session to multiple threads still gets unique ids.

use std::sync::atomic::{AtomicU64, Ordering};

static GENSYM_COUNTER: AtomicU64 = AtomicU64::new(0);
static SYNTAX_QUOTE_COUNTER: AtomicU64 = AtomicU64::new(0);

/// A fresh, process-unique symbol name: `G__<n>__auto__`.
pub fn gensym(prefix: &str) -> String {
    let n = GENSYM_COUNTER.fetch_add(1, Ordering::Relaxed);
    format!("{}__{}__auto__", prefix, n)
}

/// A fresh id for one `syntax-quote` expansion, used to hygienically
/// rewrite every trailing-`#` symbol within that template to the same
/// `name__<id>__auto__`.
pub fn next_syntax_quote_id() -> u64 {
    SYNTAX_QUOTE_COUNTER.fetch_add(1, Ordering::Relaxed)
}

/// Rewrites a trailing-`#` symbol (e.g. `tmp#`) to its hygienic expansion
/// for syntax-quote id `id`; symbols without the marker pass through.
pub fn hygienic_rewrite(name: &str, id: u64) -> String {
    match name.strip_suffix('#') {
        Some(stem) => format!("{}__{}__auto__", stem, id),
        None => name.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gensym_is_unique_per_call() {
        let a = gensym("tmp");
        let b = gensym("tmp");
        assert_ne!(a, b);
    }

    #[test]
    fn hygienic_rewrite_only_touches_trailing_hash() {
        assert_eq!(hygienic_rewrite("x", 7), "x");
        assert_eq!(hygienic_rewrite("tmp#", 7), "tmp__7__auto__");
    }
}
