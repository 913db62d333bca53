//! Interactive query collection for `ensemble ask`.
//!
//! A line-based prompt/response loop: the user either types a query, picks a
//! suggestion, or asks for help. This module is the sole producer of the
//! immutable `query` field in interactive mode. Reader and writer are
//! injected so the whole dialog is testable with cursors.

use std::io::{BufRead, Write};
use std::sync::LazyLock;

use anyhow::{Context, Result};
use regex::Regex;

/// Example queries shown in the menu.
pub const SUGGESTIONS: [&str; 7] = [
    "Research the latest developments in AI-powered medical diagnostics",
    "Analyze the financial impact of renewable energy adoption",
    "Investigate pharmaceutical drug development processes and regulations",
    "Study the market trends for electric vehicles in emerging markets",
    "Examine the role of AI in healthcare cost reduction strategies",
    "Analyze cybersecurity threats in the financial technology sector",
    "Research sustainable agriculture technologies and their economic impact",
];

const MIN_QUERY_LEN: usize = 10;
const MAX_QUERY_LEN: usize = 500;

static ANALYSIS_KEYWORD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(analyze|research|investigate|study|examine|evaluate|assess|review|explore|compare)\b")
        .unwrap()
});

/// Run the interactive menu until a query is accepted or the user exits.
///
/// Returns `Ok(None)` on exit (menu option or end of input).
pub fn collect_query<R: BufRead, W: Write>(input: &mut R, out: &mut W) -> Result<Option<String>> {
    loop {
        writeln!(out)?;
        writeln!(out, "Options:")?;
        writeln!(out, "  1. Enter your own analysis query")?;
        writeln!(out, "  2. Use a suggested query")?;
        writeln!(out, "  3. Help with query formulation")?;
        writeln!(out, "  4. Exit")?;
        write!(out, "\nSelect option (1-4): ")?;
        out.flush()?;

        let Some(choice) = read_line(input)? else {
            return Ok(None);
        };

        match choice.as_str() {
            "1" => {
                write!(out, "\nEnter your analysis query: ")?;
                out.flush()?;
                let Some(query) = read_line(input)? else {
                    return Ok(None);
                };
                if query.is_empty() {
                    writeln!(out, "Query cannot be empty. Please try again.")?;
                    continue;
                }
                if validate_query(&query, input, out)? {
                    return Ok(Some(query));
                }
            }
            "2" => {
                writeln!(out)?;
                for (idx, suggestion) in SUGGESTIONS.iter().enumerate() {
                    writeln!(out, "  {}. {suggestion}", idx + 1)?;
                }
                write!(out, "\nSelect a suggestion (1-{}): ", SUGGESTIONS.len())?;
                out.flush()?;
                let Some(raw) = read_line(input)? else {
                    return Ok(None);
                };
                let Some(selected) = raw
                    .parse::<usize>()
                    .ok()
                    .and_then(|n| n.checked_sub(1))
                    .and_then(|idx| SUGGESTIONS.get(idx))
                else {
                    writeln!(out, "Invalid selection. Please try again.")?;
                    continue;
                };
                writeln!(out, "\nSelected: {selected}")?;
                if confirm(input, out, "Use this query?")? {
                    return Ok(Some((*selected).to_string()));
                }
            }
            "3" => write_help(out)?,
            "4" => return Ok(None),
            _ => writeln!(out, "Invalid option. Please select 1-4.")?,
        }
    }
}

/// Check length bounds and nudge toward analysis-style phrasing.
///
/// A query without an analysis keyword is allowed, but only after the user
/// confirms it.
fn validate_query<R: BufRead, W: Write>(query: &str, input: &mut R, out: &mut W) -> Result<bool> {
    if query.len() < MIN_QUERY_LEN {
        writeln!(out, "Query too short (minimum {MIN_QUERY_LEN} characters).")?;
        return Ok(false);
    }
    if query.len() > MAX_QUERY_LEN {
        writeln!(out, "Query too long (maximum {MAX_QUERY_LEN} characters).")?;
        return Ok(false);
    }
    if !ANALYSIS_KEYWORD.is_match(query) {
        writeln!(
            out,
            "Tip: consider using analysis keywords like 'analyze', 'research', or 'investigate'."
        )?;
        if !confirm(input, out, "Continue anyway?")? {
            return Ok(false);
        }
    }
    writeln!(out, "Query accepted.")?;
    Ok(true)
}

fn confirm<R: BufRead, W: Write>(input: &mut R, out: &mut W, prompt: &str) -> Result<bool> {
    write!(out, "{prompt} (y/n): ")?;
    out.flush()?;
    let Some(answer) = read_line(input)? else {
        return Ok(false);
    };
    Ok(matches!(answer.to_lowercase().as_str(), "y" | "yes"))
}

fn write_help<W: Write>(out: &mut W) -> Result<()> {
    writeln!(out)?;
    writeln!(out, "Effective query structure:")?;
    writeln!(out, "  1. Action word: start with analyze, research, investigate, ...")?;
    writeln!(out, "  2. Topic: clearly state what to study")?;
    writeln!(out, "  3. Context: name the domain (medical, financial, technical, ...)")?;
    writeln!(out, "  4. Scope: time frame, geography, or other constraints")?;
    writeln!(out)?;
    writeln!(out, "Avoid yes/no questions, single-word topics, and unrelated topic mixes.")?;
    Ok(())
}

/// Read one trimmed line; `None` means end of input.
fn read_line<R: BufRead>(input: &mut R) -> Result<Option<String>> {
    let mut line = String::new();
    let read = input.read_line(&mut line).context("read input line")?;
    if read == 0 {
        return Ok(None);
    }
    Ok(Some(line.trim().to_string()))
}
