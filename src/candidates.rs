//! Candidate escape implementations under test.
//!
//! Every candidate maps `& < > ' "` to `&amp; &lt; &gt; &apos; &quot;` and
//! leaves all other characters untouched. The candidates differ only in
//! strategy (full-pass replacement chains, per-char dispatch, byte lookup,
//! chunked slice copies), which is exactly what the harness exists to
//! compare. The harness itself treats them as opaque.

/// An escape implementation under test.
pub type EscapeFn = fn(&str) -> String;

/// A named candidate registered with the harness.
#[derive(Debug, Clone, Copy)]
pub struct Candidate {
    /// Short id used in requests, datasets, and table rows.
    pub id: &'static str,
    /// Human-readable name.
    pub name: &'static str,
    /// One-line description of the strategy.
    pub summary: &'static str,
    /// The implementation.
    pub func: EscapeFn,
}

/// Escape by chaining one full-string replacement per character class.
///
/// Five passes, five intermediate allocations. The baseline to beat.
pub fn replace_chain(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('\'', "&apos;")
        .replace('"', "&quot;")
}

/// Escape with a single pass dispatching on each char.
pub fn char_match(s: &str) -> String {
    let mut out = String::new();
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '\'' => out.push_str("&apos;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}

/// Like [`char_match`], but pre-reserves capacity for the common case.
///
/// Six bytes per escape is the worst case; reserving input length plus a
/// small slack avoids most growth reallocations without overcommitting.
pub fn char_match_reserved(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + s.len() / 2);
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '\'' => out.push_str("&apos;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}

/// Escape by scanning raw bytes against a lookup of the five ASCII classes.
pub fn byte_lookup(s: &str) -> String {
    let mut out = Vec::with_capacity(s.len() + s.len() / 2);
    for &b in s.as_bytes() {
        match b {
            b'&' => out.extend_from_slice(b"&amp;"),
            b'<' => out.extend_from_slice(b"&lt;"),
            b'>' => out.extend_from_slice(b"&gt;"),
            b'\'' => out.extend_from_slice(b"&apos;"),
            b'"' => out.extend_from_slice(b"&quot;"),
            _ => out.push(b),
        }
    }
    // SAFETY: only single ASCII bytes are replaced, and ASCII bytes never
    // occur inside a multi-byte UTF-8 sequence, so the output is valid UTF-8.
    unsafe { String::from_utf8_unchecked(out) }
}

/// Escape by copying unescaped chunks wholesale between matches.
pub fn slice_scan(s: &str) -> String {
    fn entity(c: char) -> Option<&'static str> {
        match c {
            '&' => Some("&amp;"),
            '<' => Some("&lt;"),
            '>' => Some("&gt;"),
            '\'' => Some("&apos;"),
            '"' => Some("&quot;"),
            _ => None,
        }
    }

    let mut out = String::with_capacity(s.len() + s.len() / 2);
    let mut rest = s;
    while let Some(pos) = rest.find(['&', '<', '>', '\'', '"']) {
        out.push_str(&rest[..pos]);
        let c = rest[pos..].chars().next().unwrap_or('\0');
        if let Some(e) = entity(c) {
            out.push_str(e);
        }
        rest = &rest[pos + c.len_utf8()..];
    }
    out.push_str(rest);
    out
}

/// All registered candidates, in presentation order.
pub const CANDIDATES: &[Candidate] = &[
    Candidate {
        id: "replace_chain",
        name: "replace_chain: chained full-pass replaces",
        summary: "One String::replace pass per character class.",
        func: replace_chain,
    },
    Candidate {
        id: "char_match",
        name: "char_match: per-char dispatch",
        summary: "Single pass matching each char into a growing String.",
        func: char_match,
    },
    Candidate {
        id: "char_match_reserved",
        name: "char_match_reserved: per-char dispatch, reserved",
        summary: "Single pass with up-front capacity reservation.",
        func: char_match_reserved,
    },
    Candidate {
        id: "byte_lookup",
        name: "byte_lookup: raw byte scan",
        summary: "Byte-level scan with ASCII entity substitution.",
        func: byte_lookup,
    },
    Candidate {
        id: "slice_scan",
        name: "slice_scan: chunked slice copies",
        summary: "Copies unescaped chunks wholesale between matches.",
        func: slice_scan,
    },
];

/// Look up a candidate by id.
pub fn find(id: &str) -> Option<&'static Candidate> {
    CANDIDATES.iter().find(|c| c.id == id)
}

#[cfg(test)]
mod tests {
    use super::*;

    const VARIANTS: &[(&str, EscapeFn)] = &[
        ("replace_chain", replace_chain),
        ("char_match", char_match),
        ("char_match_reserved", char_match_reserved),
        ("byte_lookup", byte_lookup),
        ("slice_scan", slice_scan),
    ];

    #[test]
    fn all_variants_agree() {
        let inputs = [
            "",
            "plain text with no escapes",
            "<>&'\"",
            "a<b>c&d'e\"f",
            "&&&&",
            "ends with quote\"",
            "unicode: caf\u{e9} <tag> \u{2713}",
        ];
        for input in inputs {
            let expected = replace_chain(input);
            for (name, f) in VARIANTS {
                assert_eq!(f(input), expected, "variant {} diverged on {:?}", name, input);
            }
        }
    }

    #[test]
    fn escapes_every_class() {
        assert_eq!(char_match("<>&'\""), "&lt;&gt;&amp;&apos;&quot;");
    }

    #[test]
    fn passthrough_is_identity() {
        assert_eq!(byte_lookup("no escapes here"), "no escapes here");
    }

    #[test]
    fn registry_ids_are_unique_and_findable() {
        for c in CANDIDATES {
            assert_eq!(find(c.id).map(|c| c.id), Some(c.id));
        }
        assert!(find("h9").is_none());
    }
}
