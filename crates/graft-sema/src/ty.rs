//! Semantic type model.
//!
//! The core does not type-check the host language; it only needs enough
//! structure to recognize the two sum-type families, function signatures
//! (for call-parameter and return-slot inference), and multi-value
//! results. Everything else stays opaque, kept exactly as written in the
//! host source so registered payload strings survive round trips.

use std::fmt;

use serde::Serialize;

use graft_ast::Family;

/// A function signature as the oracle reports it.
///
/// For a variadic function, `params` holds the element type in the last
/// slot and `variadic` is set; the collection type never appears here.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct FnSig {
    pub params: Vec<Ty>,
    pub variadic: bool,
    pub results: Vec<Ty>,
}

/// A type as seen by the semantic core.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub enum Ty {
    /// An opaque host-language type, kept as written
    /// (`int`, `map[string]user_id`, `*node`).
    Host(String),
    /// The presence/absence family.
    Option(Box<Ty>),
    /// The success/failure family.
    Result(Box<Ty>, Box<Ty>),
    /// A function type.
    Fun(FnSig),
    /// A multi-value result, one entry per slot.
    Tuple(Vec<Ty>),
    /// The deliberate placeholder for unspecialized helper returns and
    /// the relaxed-mode success payload. Spelled `any` in host syntax.
    Erased,
}

impl Ty {
    /// An opaque host type.
    pub fn host(name: impl Into<String>) -> Ty {
        Ty::Host(name.into())
    }

    /// An `Option<T>` type.
    pub fn option(inner: Ty) -> Ty {
        Ty::Option(Box::new(inner))
    }

    /// A `Result<T, E>` type.
    pub fn result(ok: Ty, err: Ty) -> Ty {
        Ty::Result(Box::new(ok), Box::new(err))
    }

    /// Whether this is the host boolean type.
    pub fn is_bool(&self) -> bool {
        matches!(self, Ty::Host(name) if name == "bool")
    }

    /// Number of value slots this type occupies on a value-producing side.
    pub fn slot_count(&self) -> usize {
        match self {
            Ty::Tuple(slots) => slots.len(),
            _ => 1,
        }
    }

    /// Decompose a family type into its family and payload strings.
    ///
    /// The strings are display renderings of the payload types; callers
    /// that need registered originals must go through the registry.
    pub fn as_family(&self) -> Option<(Family, Vec<String>)> {
        match self {
            Ty::Option(inner) => Some((Family::Option, vec![inner.to_string()])),
            Ty::Result(ok, err) => {
                Some((Family::Result, vec![ok.to_string(), err.to_string()]))
            }
            _ => None,
        }
    }

    /// Parse a host type string into the structured model.
    ///
    /// Total: anything that is not a recognizable family, function, or
    /// multi-value spelling comes back as [`Ty::Host`] verbatim.
    pub fn parse(text: &str) -> Ty {
        parse_ty(text)
    }
}

impl fmt::Display for Ty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Ty::Host(name) => write!(f, "{}", name),
            Ty::Option(inner) => write!(f, "Option<{}>", inner),
            Ty::Result(ok, err) => write!(f, "Result<{}, {}>", ok, err),
            Ty::Fun(sig) => {
                write!(f, "(")?;
                for (i, p) in sig.params.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    if sig.variadic && i == sig.params.len() - 1 {
                        write!(f, "...")?;
                    }
                    write!(f, "{}", p)?;
                }
                write!(f, ") -> ")?;
                match sig.results.len() {
                    1 => write!(f, "{}", sig.results[0]),
                    _ => {
                        write!(f, "(")?;
                        for (i, r) in sig.results.iter().enumerate() {
                            if i > 0 {
                                write!(f, ", ")?;
                            }
                            write!(f, "{}", r)?;
                        }
                        write!(f, ")")
                    }
                }
            }
            Ty::Tuple(slots) => {
                write!(f, "(")?;
                for (i, s) in slots.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", s)?;
                }
                write!(f, ")")
            }
            Ty::Erased => write!(f, "any"),
        }
    }
}

// ── Parsing ────────────────────────────────────────────────────────────

fn parse_ty(text: &str) -> Ty {
    let s = text.trim();
    if s.is_empty() {
        return Ty::Host(String::new());
    }
    if s == "any" {
        return Ty::Erased;
    }
    if s.starts_with('(') {
        if let Some(ty) = parse_paren_group(s) {
            return ty;
        }
        return Ty::Host(s.to_string());
    }
    if let Some(inner) = strip_generic(s, "Option") {
        return Ty::option(parse_ty(inner));
    }
    if let Some(inner) = strip_generic(s, "Result") {
        let parts = split_top_level(inner, ',');
        if parts.len() == 2 {
            return Ty::result(parse_ty(parts[0]), parse_ty(parts[1]));
        }
        // Wrong arity: keep the spelling as written.
        return Ty::Host(s.to_string());
    }
    Ty::Host(s.to_string())
}

/// Parse `(...)` as a function type (with `-> result`) or a bare
/// multi-value tuple. Returns `None` when the group is unbalanced.
fn parse_paren_group(s: &str) -> Option<Ty> {
    let close = matching_paren(s)?;
    let inner = &s[1..close];
    let rest = s[close + 1..].trim();

    if rest.is_empty() {
        let slots: Vec<Ty> = split_top_level(inner, ',')
            .into_iter()
            .filter(|p| !p.trim().is_empty())
            .map(parse_ty)
            .collect();
        return Some(Ty::Tuple(slots));
    }

    let result_text = rest.strip_prefix("->")?.trim();
    let mut variadic = false;
    let params: Vec<Ty> = split_top_level(inner, ',')
        .into_iter()
        .filter(|p| !p.trim().is_empty())
        .map(|p| {
            let p = p.trim();
            if let Some(elem) = p.strip_prefix("...") {
                variadic = true;
                parse_ty(elem)
            } else {
                parse_ty(p)
            }
        })
        .collect();

    let results = if result_text.starts_with('(') && matching_paren(result_text) == Some(result_text.len() - 1) {
        split_top_level(&result_text[1..result_text.len() - 1], ',')
            .into_iter()
            .filter(|p| !p.trim().is_empty())
            .map(parse_ty)
            .collect()
    } else {
        vec![parse_ty(result_text)]
    };

    Some(Ty::Fun(FnSig {
        params,
        variadic,
        results,
    }))
}

/// Byte index of the `)` matching the `(` at index 0, if balanced.
fn matching_paren(s: &str) -> Option<usize> {
    let mut depth = 0usize;
    for (i, c) in s.char_indices() {
        match c {
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
    }
    None
}

/// Strip `Name< ... >` down to the `...`, verifying the angle brackets
/// stay balanced so the final `>` really closes the leading `<`.
fn strip_generic<'a>(s: &'a str, name: &str) -> Option<&'a str> {
    let body = s.strip_prefix(name)?.trim_start();
    let body = body.strip_prefix('<')?;
    let body = body.strip_suffix('>')?;
    let mut depth = 0i32;
    let mut prev = '\0';
    for c in body.chars() {
        match c {
            '<' => depth += 1,
            // '>' in a `->` arrow is not a bracket.
            '>' if prev != '-' => {
                depth -= 1;
                if depth < 0 {
                    return None;
                }
            }
            _ => {}
        }
        prev = c;
    }
    if depth != 0 {
        return None;
    }
    Some(body)
}

/// Split on a separator at bracket depth zero. Depth tracks `<>`, `[]`,
/// `()`, and `{}`; the `>` of a `->` arrow does not close a bracket.
fn split_top_level(s: &str, sep: char) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0i32;
    let mut start = 0usize;
    let mut prev = '\0';
    for (i, c) in s.char_indices() {
        match c {
            '<' | '[' | '(' | '{' => depth += 1,
            '>' if prev != '-' => depth -= 1,
            ']' | ')' | '}' => depth -= 1,
            c if c == sep && depth == 0 => {
                parts.push(&s[start..i]);
                start = i + 1;
            }
            _ => {}
        }
        prev = c;
    }
    parts.push(&s[start..]);
    parts
}
