use std::fmt::{Display, Formatter, Result, Write};

use itertools::Itertools;
use tracing::trace;

use crate::{
    body::{Edge, State},
    header::{Header, HeaderValue},
};

use super::Automaton;

/// Types that can be written in the HOA format.
pub trait WriteHoa {
    /// Writes the HOA representation of `self` into `w`.
    fn write_hoa<W: Write>(&self, w: &mut W) -> Result;

    /// Returns the HOA representation of `self` as a string.
    fn to_hoa(&self) -> String {
        let mut out = String::new();
        // formatting into a string cannot fail
        let _ = self.write_hoa(&mut out);
        trace!("produced HOA string\n{}", out);
        out
    }
}

fn write_quoted<W: Write>(w: &mut W, text: &str) -> Result {
    w.write_char('"')?;
    for c in text.chars() {
        match c {
            '"' | '\\' => {
                w.write_char('\\')?;
                w.write_char(c)?;
            }
            c => w.write_char(c)?,
        }
    }
    w.write_char('"')
}

impl WriteHoa for Header {
    fn write_hoa<W: Write>(&self, w: &mut W) -> Result {
        writeln!(w, "HOA: {}", self.version)?;
        writeln!(w, "States: {}", self.states)?;
        for start in &self.start {
            writeln!(w, "Start: {start}")?;
        }

        write!(w, "AP: {}", self.ap_count)?;
        for ap in &self.aps {
            w.write_char(' ')?;
            write_quoted(w, ap)?;
        }
        w.write_char('\n')?;

        for (name, formula) in &self.aliases {
            writeln!(w, "Alias: @{name} {formula}")?;
        }
        writeln!(
            w,
            "Acceptance: {} {}",
            self.acceptance.sets, self.acceptance.condition
        )?;

        if let Some(acc_name) = &self.acceptance_name {
            write!(w, "acc-name: {}", acc_name.name)?;
            for parameter in &acc_name.parameters {
                write!(w, " {parameter}")?;
            }
            w.write_char('\n')?;
        }
        if let Some(tool) = &self.tool {
            w.write_str("tool: ")?;
            write_quoted(w, &tool.name)?;
            if let Some(version) = &tool.version {
                w.write_char(' ')?;
                write_quoted(w, version)?;
            }
            w.write_char('\n')?;
        }
        if let Some(name) = &self.name {
            w.write_str("name: ")?;
            write_quoted(w, name)?;
            w.write_char('\n')?;
        }
        if !self.properties.is_empty() {
            writeln!(w, "properties: {}", self.properties.iter().join(" "))?;
        }

        for custom in &self.custom {
            write!(w, "{}:", custom.name)?;
            for value in &custom.values {
                w.write_char(' ')?;
                match value {
                    HeaderValue::Boolean(b) => w.write_str(if *b { "t" } else { "f" })?,
                    HeaderValue::Int(n) => write!(w, "{n}")?,
                    HeaderValue::Text(text) => write_quoted(w, text)?,
                    HeaderValue::Identifier(ident) => w.write_str(ident)?,
                }
            }
            w.write_char('\n')?;
        }
        Ok(())
    }
}

impl WriteHoa for Edge {
    fn write_hoa<W: Write>(&self, w: &mut W) -> Result {
        if let Some(label) = &self.label {
            write!(w, "[{label}] ")?;
        }
        write!(w, "{}", self.target)?;
        if let Some(acceptance) = &self.acceptance {
            write!(w, " {acceptance}")?;
        }
        Ok(())
    }
}

impl WriteHoa for State {
    fn write_hoa<W: Write>(&self, w: &mut W) -> Result {
        w.write_str("State: ")?;
        if let Some(label) = &self.label {
            write!(w, "[{label}] ")?;
        }
        write!(w, "{}", self.index)?;
        if let Some(name) = &self.name {
            w.write_char(' ')?;
            write_quoted(w, name)?;
        }
        if let Some(acceptance) = &self.acceptance {
            write!(w, " {acceptance}")?;
        }
        for edge in &self.edges {
            w.write_char('\n')?;
            edge.write_hoa(w)?;
        }
        Ok(())
    }
}

impl WriteHoa for Automaton {
    fn write_hoa<W: Write>(&self, w: &mut W) -> Result {
        self.header.write_hoa(w)?;
        w.write_str("--BODY--\n")?;
        for state in &self.states {
            state.write_hoa(w)?;
            w.write_char('\n')?;
        }
        w.write_str("--END--\n")
    }
}

impl Display for Automaton {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        self.write_hoa(f)
    }
}
