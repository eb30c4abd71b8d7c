//! file: cli/src/output.rs
//! description: terminal rendering for the `slate` commands.
//!
//! Styled status lines go through `Printer`, which writes into any
//! `Write` so tests can capture the output. Tabular reports (program
//! statistics, the data part, pool usage) are built with `comfy-table`.

use comfy_table::{presets::UTF8_FULL, Cell, ContentArrangement, Table};
use console::Style;
use std::io::{self, Write};

use slate_core::ir::{CompiledProgram, DataDecl};
use slate_core::symbol::Named;
use slate_core::SlateErrorExt;

/// Styles for different output elements.
pub struct FormatStyle {
    pub title: Style,
    pub info: Style,
    pub warning: Style,
    pub error: Style,
    pub success: Style,
}

impl Default for FormatStyle {
    fn default() -> Self {
        FormatStyle {
            title: Style::new().bold().underlined(),
            info: Style::new().cyan(),
            warning: Style::new().yellow(),
            error: Style::new().red().bold(),
            success: Style::new().green().bold(),
        }
    }
}

impl FormatStyle {
    /// Every style a no-op; used when output is not a terminal.
    pub fn plain() -> Self {
        FormatStyle {
            title: Style::new(),
            info: Style::new(),
            warning: Style::new(),
            error: Style::new(),
            success: Style::new(),
        }
    }
}

pub struct Printer<T: Write> {
    out: T,
    formatting: FormatStyle,
}

impl<T: Write> Printer<T> {
    pub fn new(out: T) -> Self {
        Printer { out, formatting: FormatStyle::default() }
    }

    pub fn with_formatting(mut self, formatting: FormatStyle) -> Self {
        self.formatting = formatting;
        self
    }

    fn styled(&mut self, text: &str, style: Option<&Style>) -> io::Result<()> {
        match style {
            Some(s) => writeln!(self.out, "{}", s.apply_to(text)),
            None => writeln!(self.out, "{}", text),
        }
    }

    pub fn title(&mut self, text: &str) -> io::Result<()> {
        let style = self.formatting.title.clone();
        self.styled(text, Some(&style))
    }

    pub fn info(&mut self, text: &str) -> io::Result<()> {
        let style = self.formatting.info.clone();
        self.styled(text, Some(&style))
    }

    pub fn warning(&mut self, text: &str) -> io::Result<()> {
        let style = self.formatting.warning.clone();
        self.styled(text, Some(&style))
    }

    pub fn error(&mut self, text: &str) -> io::Result<()> {
        let style = self.formatting.error.clone();
        self.styled(text, Some(&style))
    }

    pub fn success(&mut self, text: &str) -> io::Result<()> {
        let style = self.formatting.success.clone();
        self.styled(text, Some(&style))
    }

    pub fn raw(&mut self, text: &str) -> io::Result<()> {
        self.styled(text, None)
    }

    /// One styled line per diagnostic, then a summary line.
    pub fn diagnostics(&mut self, errors: &[Box<dyn SlateErrorExt>]) -> io::Result<()> {
        for e in errors {
            let line = slate_core::generate_error_report(e.as_ref());
            self.error(&line)?;
        }
        self.warning(&format!("{} diagnostic(s), no program written", errors.len()))
    }
}

fn new_table(header: Vec<&str>) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(header);
    table
}

pub fn stats_table(program: &CompiledProgram) -> Table {
    let stats = program.stats();
    let mut table = new_table(vec!["metric", "count"]);
    table.add_row(vec![Cell::new("blocks"), Cell::new(stats.blocks)]);
    table.add_row(vec![Cell::new("data declarations"), Cell::new(stats.data_decls)]);
    for (class, n) in &stats.slots {
        table.add_row(vec![Cell::new(format!("  {}", class)), Cell::new(n)]);
    }
    table.add_row(vec![Cell::new("code instructions"), Cell::new(stats.code_instructions)]);
    table.add_row(vec![Cell::new("  extern calls"), Cell::new(stats.externs)]);
    table.add_row(vec![Cell::new("  jumps"), Cell::new(stats.jumps)]);
    table.add_row(vec![Cell::new("  labels"), Cell::new(stats.labels)]);
    table
}

fn data_row(decl: &DataDecl) -> Vec<Cell> {
    let flags = match (decl.export, decl.sync) {
        (true, Some(mode)) => format!("export, sync {}", mode),
        (true, None) => "export".to_string(),
        (false, Some(mode)) => format!("sync {}", mode),
        (false, None) => String::new(),
    };
    vec![
        Cell::new(decl.label.identifier()),
        Cell::new(decl.class()),
        Cell::new(decl.ty.platform_name()),
        Cell::new(decl.init.to_string()),
        Cell::new(flags),
    ]
}

pub fn data_table(program: &CompiledProgram) -> Table {
    let mut table = new_table(vec!["slot", "class", "type", "initial", "flags"]);
    for decl in &program.data {
        table.add_row(data_row(decl));
    }
    table
}

pub fn slot_usage_table(program: &CompiledProgram) -> Table {
    let mut table = new_table(vec!["block", "retains", "releases", "slots"]);
    for u in &program.slot_usage {
        table.add_row(vec![
            Cell::new(&u.function),
            Cell::new(u.retains),
            Cell::new(u.releases),
            Cell::new(u.minted),
        ]);
    }
    table
}

#[cfg(test)]
mod tests {
    use super::*;
    use slate_core::ast::Ty;
    use slate_core::ir::{Fragment, InitialValue};
    use slate_core::symbol::{Label, Qualifier, VarLabel};

    #[test]
    fn plain_printer_writes_unstyled_lines() {
        let mut buf = Vec::new();
        {
            let mut p = Printer::new(&mut buf).with_formatting(FormatStyle::plain());
            p.info("lowered 2 blocks").expect("write");
        }
        assert_eq!(String::from_utf8_lossy(&buf), "lowered 2 blocks\n");
    }

    #[test]
    fn data_table_lists_every_slot() {
        let x = Label::Var(VarLabel::user(Qualifier::from_segments(["M"]), "x", Ty::named("SystemInt32")));
        let mut decl = DataDecl::new(x, Ty::named("SystemInt32"), InitialValue::Null);
        decl.export = true;
        let program = CompiledProgram::new(vec![decl], Fragment::new(), Vec::new());
        let rendered = data_table(&program).to_string();
        assert!(rendered.contains("__var_1M1x"));
        assert!(rendered.contains("export"));
    }
}
