use tracing::{debug, info};

use crate::{
    ast::Command,
    error::{Error, Result},
    parser::parse_lines,
    translator::Translator,
};

pub const DEFAULT_ENTRY: &str = "Sys.init";

/// When to put the bootstrap sequence in front of the program.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Bootstrap {
    /// Only if one of the units defines the entry function.
    #[default]
    Auto,
    Always,
    Never,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Options {
    pub bootstrap: Bootstrap,
    /// Function the bootstrap calls.
    pub entry: String,
    /// Echo every VM command as a comment above its code.
    pub annotate: bool,
}

impl Default for Options {
    fn default() -> Self {
        Options {
            bootstrap: Bootstrap::default(),
            entry: DEFAULT_ENTRY.to_string(),
            annotate: true,
        }
    }
}

/// One source file's commands, named after the file for static scoping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Unit {
    pub name: String,
    commands: Vec<Command>,
    lines: Vec<usize>,
}

impl Unit {
    /// Commands are numbered 1, 2, 3... for error reporting.
    pub fn new(name: impl Into<String>, commands: Vec<Command>) -> Self {
        let lines = (1..=commands.len()).collect();
        Unit {
            name: name.into(),
            commands,
            lines,
        }
    }

    pub fn parse(name: impl Into<String>, source: &str) -> Result<Self> {
        let name = name.into();
        match parse_lines(source) {
            Ok(parsed) => {
                let (lines, commands) = parsed.into_iter().unzip();
                Ok(Unit {
                    name,
                    commands,
                    lines,
                })
            }
            Err(error) => Err(Error::Parse { unit: name, error }),
        }
    }

    pub fn commands(&self) -> &[Command] {
        &self.commands
    }

    pub fn defines(&self, function: &str) -> bool {
        self.commands
            .iter()
            .any(|command| matches!(command, Command::Function(name, _) if name == function))
    }
}

/// Builds one program out of units added one after the other.
///
/// A unit that fails to translate leaves the program untouched, so the
/// caller may report it and carry on with the rest.
pub struct Linker {
    translator: Translator,
    options: Options,
    body: Vec<String>,
    defines_entry: bool,
    units: usize,
}

impl Linker {
    pub fn new(options: Options) -> Self {
        Linker {
            translator: Translator::new("").with_annotations(options.annotate),
            options,
            body: vec![],
            defines_entry: false,
            units: 0,
        }
    }

    pub fn add_unit(&mut self, unit: &Unit) -> Result<()> {
        let checkpoint = self.translator.clone();
        self.translator.set_unit(&unit.name);

        let mut code = vec![];
        for (command, line) in unit.commands.iter().zip(&unit.lines) {
            match self.translator.translate_command(command) {
                Ok(translated) => code.extend(translated),
                Err(error) => {
                    // Forget the labels and statics this unit got to define.
                    self.translator = checkpoint;
                    return Err(Error::Codegen {
                        unit: unit.name.clone(),
                        line: *line,
                        error,
                    });
                }
            }
        }

        debug!(
            unit = %unit.name,
            commands = unit.commands.len(),
            instructions = code.len(),
            "translated unit"
        );
        self.defines_entry |= unit.defines(&self.options.entry);
        self.body.extend(code);
        self.units += 1;
        Ok(())
    }

    pub fn finish(mut self) -> Vec<String> {
        let bootstrap = match self.options.bootstrap {
            Bootstrap::Always => true,
            Bootstrap::Never => false,
            Bootstrap::Auto => self.defines_entry,
        };

        let mut output = if bootstrap {
            debug!(entry = %self.options.entry, "emitting bootstrap");
            self.translator.bootstrap(&self.options.entry)
        } else {
            vec![]
        };
        output.append(&mut self.body);

        info!(
            units = self.units,
            statics = self.translator.static_count(),
            lines = output.len(),
            bootstrap,
            "linked program"
        );
        output
    }
}

/// Bootstrap (if any) followed by every unit's code, in the order given.
///
/// With `Options::default()` the bootstrap is only emitted when some unit
/// defines `Sys.init`; pass [`Bootstrap::Always`] to get it unconditionally.
pub fn link(units: &[Unit], options: &Options) -> Result<Vec<String>> {
    let mut linker = Linker::new(options.clone());
    for unit in units {
        linker.add_unit(unit)?;
    }
    Ok(linker.finish())
}

/// Parses and links `(unit name, source text)` pairs.
pub fn translate_sources<N, S>(sources: &[(N, S)], options: &Options) -> Result<Vec<String>>
where
    N: AsRef<str>,
    S: AsRef<str>,
{
    let units = sources
        .iter()
        .map(|(name, source)| Unit::parse(name.as_ref(), source.as_ref()))
        .collect::<Result<Vec<_>>>()?;
    link(&units, options)
}
