// src/exec/rule.rs

//! Pattern-matching factory for command actions.
//!
//! A `CommandRule` turns "every file matching these globs" into
//! [`CommandAction`]s built from a command template. Templates may use
//! `{file}` (the matched path) and `{stem}` (its file stem), in the command
//! itself, in required/provided entity ids, and in the output basename.
//! That is enough to express classic suffix rules like "compile every `*.c`
//! into `{stem}.o` providing `object:{stem}`".
//!
//! A rule may also subscribe to trigger entities, in which case it is offered
//! the providing file whenever one of them is published.

use anyhow::Context;
use globset::{Glob, GlobSet, GlobSetBuilder};

use crate::action::{Action, ActionFactory};
use crate::errors::Result;
use crate::exec::CommandAction;
use crate::fs::FileHandle;
use crate::types::EntityId;

pub struct CommandRule {
    verb: String,
    pattern: GlobSet,
    cmd_template: String,
    requires: Vec<(String, String)>,
    /// Output basename template and the entity id templates it provides.
    provides: Option<(String, Vec<String>)>,
    triggers: Vec<EntityId>,
}

impl CommandRule {
    pub fn new(verb: impl Into<String>, patterns: &[&str], cmd_template: impl Into<String>) -> Result<Self> {
        let mut builder = GlobSetBuilder::new();
        for pattern in patterns {
            let glob = Glob::new(pattern)
                .with_context(|| format!("invalid glob pattern {pattern:?}"))?;
            builder.add(glob);
        }
        let pattern = builder
            .build()
            .context("building glob set for command rule")?;

        Ok(Self {
            verb: verb.into(),
            pattern,
            cmd_template: cmd_template.into(),
            requires: Vec::new(),
            provides: None,
            triggers: Vec::new(),
        })
    }

    /// Require an entity (id template) before the command runs; `title` is
    /// the human name used when reporting it missing.
    pub fn requires(mut self, id_template: impl Into<String>, title: impl Into<String>) -> Self {
        self.requires.push((id_template.into(), title.into()));
        self
    }

    /// Declare an output file (basename template) providing the given entity
    /// id templates.
    pub fn provides(
        mut self,
        output_template: impl Into<String>,
        entity_templates: Vec<String>,
    ) -> Self {
        self.provides = Some((output_template.into(), entity_templates));
        self
    }

    /// Also synthesize an action whenever `id` is published.
    pub fn trigger_on(mut self, id: EntityId) -> Self {
        self.triggers.push(id);
        self
    }

    /// Expand the rule's templates against `file` into a concrete action.
    pub fn instantiate(&self, file: &FileHandle) -> CommandAction {
        let path = file.display_name();
        let stem = file
            .path()
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let expand = |template: &str| {
            template
                .replace("{file}", &path)
                .replace("{stem}", &stem)
        };

        let mut action = CommandAction::new(&self.verb, expand(&self.cmd_template));
        for (id_template, title) in &self.requires {
            action = action.requires(EntityId::new(expand(id_template)), expand(title));
        }
        if let Some((output_template, entity_templates)) = &self.provides {
            let entities = entity_templates
                .iter()
                .map(|t| EntityId::new(expand(t)))
                .collect();
            action = action.provides(expand(output_template), entities);
        }
        action
    }
}

impl ActionFactory for CommandRule {
    fn try_make_action(&self, file: &FileHandle) -> Option<Box<dyn Action>> {
        if !self.pattern.is_match(file.path()) {
            return None;
        }
        Some(Box::new(self.instantiate(file)))
    }

    fn trigger_entities(&self) -> Vec<EntityId> {
        self.triggers.clone()
    }

    fn try_make_triggered_action(
        &self,
        _id: &EntityId,
        file: &FileHandle,
    ) -> Option<Box<dyn Action>> {
        // Triggered invocations already name the entity; the glob only
        // gates the discovery scan.
        Some(Box::new(self.instantiate(file)))
    }
}

impl std::fmt::Debug for CommandRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandRule")
            .field("verb", &self.verb)
            .field("cmd_template", &self.cmd_template)
            .finish_non_exhaustive()
    }
}
