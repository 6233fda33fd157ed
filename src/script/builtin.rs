//! # Built-in Scripts
//!
//! Named scripts that run inside the vatch process (in-process mode). Each one
//! receives a [`ScriptIo`] with its arguments and capturing output streams.
//!
//! | Name | Arguments | Output |
//! |------|-----------|--------|
//! | `echo` | words... | the words, space separated |
//! | `date` | `[FORMAT]` | local time, `strftime` format (default `%c`) |
//! | `cat` | files... | file contents |
//! | `ls` | `[DIR]` | directory entries, sorted, directories suffixed `/` |
//! | `env` | `[NAME]` | one variable, or all of them sorted |

use crate::script::capture::ScriptIo;
use anyhow::{Context, Result};
use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use walkdir::WalkDir;

/// A script body.
pub type ScriptFn = Box<dyn Fn(&mut ScriptIo) -> Result<()>>;

/// Scripts that can be invoked by name.
pub struct ScriptRegistry {
    scripts: BTreeMap<String, ScriptFn>,
}

impl Default for ScriptRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

impl std::fmt::Debug for ScriptRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.scripts.keys()).finish()
    }
}

impl ScriptRegistry {
    pub fn empty() -> Self {
        Self {
            scripts: BTreeMap::new(),
        }
    }

    pub fn with_builtins() -> Self {
        let mut registry = Self::empty();
        registry.register("echo", echo);
        registry.register("date", date);
        registry.register("cat", cat);
        registry.register("ls", ls);
        registry.register("env", env);
        registry
    }

    /// Add or replace a script.
    pub fn register<F>(&mut self, name: &str, script: F)
    where
        F: Fn(&mut ScriptIo) -> Result<()> + 'static,
    {
        self.scripts.insert(name.to_string(), Box::new(script));
    }

    pub fn get(&self, name: &str) -> Option<&ScriptFn> {
        self.scripts.get(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.scripts.keys().map(String::as_str)
    }
}

fn echo(io: &mut ScriptIo) -> Result<()> {
    let line = io.args().join(" ");
    writeln!(io.stdout, "{line}")?;
    Ok(())
}

fn date(io: &mut ScriptIo) -> Result<()> {
    let format = io.args().first().map_or("%c", String::as_str).to_string();
    let now = chrono::Local::now();
    writeln!(io.stdout, "{}", now.format(&format))
        .with_context(|| format!("Invalid date format: {format}"))?;
    Ok(())
}

fn cat(io: &mut ScriptIo) -> Result<()> {
    if io.args().is_empty() {
        anyhow::bail!("cat: no files given");
    }
    for path in io.args().to_vec() {
        let contents = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read file: {path}"))?;
        io.stdout.write_all(contents.as_bytes())?;
    }
    Ok(())
}

fn ls(io: &mut ScriptIo) -> Result<()> {
    let dir = io.args().first().map_or(".", String::as_str).to_string();
    let mut names = Vec::new();
    for entry in WalkDir::new(&dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
    {
        let entry = entry.with_context(|| format!("Failed to list directory: {dir}"))?;
        let mut name = entry.file_name().to_string_lossy().into_owned();
        if entry.file_type().is_dir() {
            name.push('/');
        }
        names.push(name);
    }
    for name in names {
        writeln!(io.stdout, "{name}")?;
    }
    Ok(())
}

fn env(io: &mut ScriptIo) -> Result<()> {
    if let Some(name) = io.args().first().cloned() {
        let value = std::env::var(&name)
            .with_context(|| format!("Environment variable not set: {name}"))?;
        writeln!(io.stdout, "{value}")?;
        return Ok(());
    }

    let vars: BTreeMap<String, String> = std::env::vars().collect();
    for (key, value) in vars {
        writeln!(io.stdout, "{key}={value}")?;
    }
    Ok(())
}
