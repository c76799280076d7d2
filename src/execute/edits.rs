// Scoped textual edits. Every function here returns `None` when the
// requested edit cannot be made safely; the caller records a failure and
// leaves the file untouched.

use crate::analysis::{match_braces, Fragment, Span};

/// Removes the byte range a span covers, plus one trailing newline when
/// present. `None` when the span does not fall on valid boundaries.
pub fn remove_span(contents: &str, span: &Span) -> Option<String> {
    let start = span.start_byte;
    let mut end = span.end_byte;
    if start >= end || end > contents.len() {
        return None;
    }
    if !contents.is_char_boundary(start) || !contents.is_char_boundary(end) {
        return None;
    }
    if contents[end..].starts_with('\n') {
        end += 1;
    }

    let mut out = String::with_capacity(contents.len() - (end - start));
    out.push_str(&contents[..start]);
    out.push_str(&contents[end..]);
    Some(out)
}

/// Removes a declaration whose body is brace-delimited, starting the scan
/// at the declaration's first byte. The removal is bounded by the matching
/// close brace; unbalanced braces abort the edit.
pub fn remove_braced_block(contents: &str, decl_start: usize) -> Option<String> {
    if decl_start >= contents.len() || !contents.is_char_boundary(decl_start) {
        return None;
    }
    let open = contents[decl_start..].find('{')? + decl_start;
    // match_braces returns the index one past the closing brace
    let close = match_braces(contents, open)?;

    let span = Span::new(0, 0, decl_start, close);
    remove_span(contents, &span)
}

/// Removes whole lines, 1-indexed and inclusive. `None` when the range
/// exceeds the file.
pub fn remove_lines(contents: &str, start_line: usize, end_line: usize) -> Option<String> {
    if start_line == 0 || end_line < start_line {
        return None;
    }
    let lines: Vec<&str> = contents.split_inclusive('\n').collect();
    if end_line > lines.len() {
        return None;
    }

    let mut out = String::with_capacity(contents.len());
    for (index, line) in lines.iter().enumerate() {
        let line_no = index + 1;
        if line_no < start_line || line_no > end_line {
            out.push_str(line);
        }
    }
    Some(out)
}

/// Rewrites a duplicate method body into a call to the canonical member,
/// keeping the original signature. `None` when the body cannot be located.
pub fn rewrite_as_delegate(
    contents: &str,
    duplicate: &Fragment,
    canonical: &Fragment,
) -> Option<String> {
    let decl_start = duplicate.span.start_byte;
    if decl_start >= contents.len() || !contents.is_char_boundary(decl_start) {
        return None;
    }
    let open = contents[decl_start..].find('{')? + decl_start;
    let close = match_braces(contents, open)?;

    let args = duplicate
        .params
        .iter()
        .map(|p| param_variable(p))
        .collect::<Vec<_>>()
        .join(", ");
    let body = format!(" return $this->{}({}); ", canonical.name, args);

    // close is one past the closing brace; keep the brace itself
    let mut out = String::with_capacity(contents.len());
    out.push_str(&contents[..open + 1]);
    out.push_str(&body);
    out.push_str(&contents[close - 1..]);
    Some(out)
}

/// Argument expression for a declared parameter: `int $x = 0` becomes `$x`
fn param_variable(param: &str) -> String {
    param
        .split('=')
        .next()
        .unwrap_or(param)
        .split_whitespace()
        .find(|token| token.starts_with('$'))
        .map(|token| token.to_string())
        .unwrap_or_else(|| format!("${}", param.trim()))
}

/// Picks which member of a duplicate group survives.
///
/// Implementations rank fragments; the highest score wins. The default
/// favors the longest, documented, error-handling variant.
pub trait CanonicalScorer: Send + Sync {
    fn score(&self, fragment: &Fragment) -> f64;
}

/// Length, documentation and error handling, in that weight order
pub struct DefaultScorer;

impl CanonicalScorer for DefaultScorer {
    fn score(&self, fragment: &Fragment) -> f64 {
        let mut score = fragment.byte_len as f64 / 100.0;
        if fragment.content.contains("/**") || fragment.content.contains("//") {
            score += 5.0;
        }
        if fragment.content.contains("try")
            || fragment.content.contains("throw")
            || fragment.content.contains("catch")
        {
            score += 3.0;
        }
        score
    }
}

/// Index of the canonical member in `members`
pub fn pick_canonical(members: &[Fragment], scorer: &dyn CanonicalScorer) -> usize {
    members
        .iter()
        .enumerate()
        .max_by(|(_, a), (_, b)| {
            scorer
                .score(a)
                .partial_cmp(&scorer.score(b))
                .unwrap_or(std::cmp::Ordering::Equal)
        })
        .map(|(index, _)| index)
        .unwrap_or(0)
}
