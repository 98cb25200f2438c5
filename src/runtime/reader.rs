//! Reader for the textual command/expression boundary
//!
//! Parses the s-expression subset the binding layer emits into a `Form`
//! tree. The engine's full grammar is not modeled here; only what crosses
//! the command interface.

use crate::error::ClaspError;
use crate::ClaspResult;
use pest::iterators::Pair;
use pest::Parser;
use pest_derive::Parser;

#[derive(Parser)]
#[grammar = "src/runtime/command.pest"]
pub struct CommandParser;

/// One parsed s-expression form.
#[derive(Debug, Clone, PartialEq)]
pub enum Form {
    List(Vec<Form>),
    Int(i64),
    Float(f64),
    Str(String),
    Sym(String),
    /// An `[instance-name]` literal, without the brackets
    Name(String),
}

impl Form {
    /// The symbol text, if this form is a symbol
    pub fn as_symbol(&self) -> Option<&str> {
        match self {
            Form::Sym(s) => Some(s.as_str()),
            _ => None,
        }
    }

    /// Short description for diagnostics
    pub fn describe(&self) -> String {
        match self {
            Form::List(_) => "a list".to_string(),
            Form::Int(i) => format!("integer {}", i),
            Form::Float(f) => format!("float {}", f),
            Form::Str(s) => format!("string \"{}\"", s),
            Form::Sym(s) => format!("symbol {}", s),
            Form::Name(n) => format!("instance name [{}]", n),
        }
    }
}

/// Parse every top-level form in `text`.
pub fn parse_forms(text: &str) -> ClaspResult<Vec<Form>> {
    let pairs = CommandParser::parse(Rule::program, text).map_err(|e| {
        let (line, col) = match e.line_col {
            pest::error::LineColLocation::Pos((line, col)) => (line, col),
            pest::error::LineColLocation::Span((line, col), _) => (line, col),
        };
        ClaspError::Parse {
            message: format!("{}", e.variant),
            line,
            col,
        }
    })?;

    let mut forms = Vec::new();
    for pair in pairs {
        if pair.as_rule() == Rule::program {
            for inner in pair.into_inner() {
                if inner.as_rule() != Rule::EOI {
                    forms.push(build_form(inner)?);
                }
            }
        }
    }
    Ok(forms)
}

/// Parse exactly one form; trailing forms are an error.
pub fn parse_form(text: &str) -> ClaspResult<Form> {
    let mut forms = parse_forms(text)?;
    match forms.len() {
        1 => Ok(forms.remove(0)),
        0 => Err(ClaspError::Parse {
            message: "expected an expression".to_string(),
            line: 1,
            col: 1,
        }),
        n => Err(ClaspError::Parse {
            message: format!("expected a single expression, found {}", n),
            line: 1,
            col: 1,
        }),
    }
}

fn build_form(pair: Pair<Rule>) -> ClaspResult<Form> {
    match pair.as_rule() {
        Rule::list => {
            let mut elements = Vec::new();
            for inner in pair.into_inner() {
                elements.push(build_form(inner)?);
            }
            Ok(Form::List(elements))
        }
        Rule::integer => pair
            .as_str()
            .parse::<i64>()
            .map(Form::Int)
            .map_err(|_| ClaspError::Engine(format!("integer overflow: {}", pair.as_str()))),
        Rule::float => pair
            .as_str()
            .parse::<f64>()
            .map(Form::Float)
            .map_err(|_| ClaspError::Engine(format!("bad float literal: {}", pair.as_str()))),
        Rule::string => {
            let raw = pair.as_str();
            Ok(Form::Str(unescape(&raw[1..raw.len() - 1])))
        }
        Rule::instance_name => {
            let raw = pair.as_str();
            Ok(Form::Name(raw[1..raw.len() - 1].to_string()))
        }
        Rule::symbol => Ok(Form::Sym(pair.as_str().to_string())),
        other => Err(ClaspError::Engine(format!(
            "unexpected parse rule: {:?}",
            other
        ))),
    }
}

fn unescape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            if let Some(next) = chars.next() {
                out.push(next);
            }
        } else {
            out.push(c);
        }
    }
    out
}
