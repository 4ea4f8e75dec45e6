/*!
 * Prompt templates for unit translation.
 *
 * Templates are plain text with `{{Name}}` placeholders. Stored templates
 * override the builtin ones per scope, most specific first:
 * provider, then project, then global.
 */

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use log::{debug, warn};
use once_cell::sync::Lazy;
use regex::Regex;
use std::sync::Arc;

use crate::database::models::TemplateScope;
use crate::database::ports::TemplateStore;
use crate::language_utils;

/// Template type used for single-unit translation
pub const TRANSLATE_SINGLE: &str = "translate_single";

/// Template roles
pub const ROLE_SYSTEM: &str = "system";
pub const ROLE_USER: &str = "user";

/// Rendered in place of an unset source language
const UNKNOWN_SOURCE_LANGUAGE: &str = "the source language";

static TEMPLATE_VAR_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\{\{\s*\.?([A-Za-z]+)\s*\}\}").expect("valid template variable regex")
});

const SINGLE_SYSTEM: &str = "You are a professional localization translator. Translate from {{SrcLang}} to {{TgtLang}}. Preserve placeholders exactly (e.g., {{Placeholders}}) and inline tags like <sfx>, <clr:...>. Do not change whitespace or punctuation. Return only JSON: {\"translation\":\"...\"}.";

const SINGLE_USER: &str =
    "project: {{Project}} file: {{FilePath}} key: {{Key}} context: {{Context}}\nsource: {{Text}}";

/// Structured values available to templates
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PromptData {
    /// Source locale code; may be empty
    pub src_lang: String,
    pub tgt_lang: String,
    pub key: String,
    /// Masked source text
    pub text: String,
    pub file_path: String,
    /// Project display name
    pub project: String,
    pub context: String,
    pub placeholders: Vec<String>,
    pub tags: Vec<String>,
    /// Used for project-scope template lookup
    pub project_id: Option<i64>,
}

impl PromptData {
    fn value(&self, name: &str) -> Option<String> {
        let value = match name {
            "SrcLang" if self.src_lang.trim().is_empty() => UNKNOWN_SOURCE_LANGUAGE.to_string(),
            "SrcLang" => language_utils::display_name(&self.src_lang),
            "TgtLang" => language_utils::display_name(&self.tgt_lang),
            "Key" => self.key.clone(),
            "Text" => self.text.clone(),
            "FilePath" => self.file_path.clone(),
            "Project" => self.project.clone(),
            "Context" => self.context.clone(),
            "Placeholders" => join_or_none(&self.placeholders),
            "Tags" => join_or_none(&self.tags),
            _ => return None,
        };
        Some(value)
    }
}

fn join_or_none(items: &[String]) -> String {
    if items.is_empty() {
        "none".to_string()
    } else {
        items.join(", ")
    }
}

/// Substitute `{{Name}}` variables; unknown names are an error
pub fn render_template(body: &str, data: &PromptData) -> Result<String> {
    let mut out = String::with_capacity(body.len() + data.text.len());
    let mut last = 0;

    for caps in TEMPLATE_VAR_RE.captures_iter(body) {
        let (Some(whole), Some(name)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        let value = data
            .value(name.as_str())
            .ok_or_else(|| anyhow!("unknown template variable: {}", name.as_str()))?;
        out.push_str(&body[last..whole.start()]);
        out.push_str(&value);
        last = whole.end();
    }
    out.push_str(&body[last..]);

    Ok(out)
}

/// Builtin template body for a type and role
pub fn builtin_template(template_type: &str, role: &str) -> Option<&'static str> {
    match (template_type, role) {
        (TRANSLATE_SINGLE, ROLE_SYSTEM) => Some(SINGLE_SYSTEM),
        (TRANSLATE_SINGLE, ROLE_USER) => Some(SINGLE_USER),
        _ => None,
    }
}

/// Renders prompts for the translator
#[async_trait]
pub trait PromptRenderer: Send + Sync {
    async fn render(
        &self,
        scope: TemplateScope,
        ref_id: Option<i64>,
        template_type: &str,
        role: &str,
        data: &PromptData,
    ) -> Result<String>;
}

/// Renderer backed by stored templates with builtin fallback
#[derive(Clone)]
pub struct TemplatePromptRenderer {
    templates: Arc<dyn TemplateStore>,
}

impl TemplatePromptRenderer {
    pub fn new(templates: Arc<dyn TemplateStore>) -> Self {
        Self { templates }
    }

    fn lookup_chain(
        scope: TemplateScope,
        ref_id: Option<i64>,
        data: &PromptData,
    ) -> Vec<(TemplateScope, Option<i64>)> {
        let mut chain = Vec::with_capacity(3);
        if scope == TemplateScope::Provider && ref_id.is_some() {
            chain.push((TemplateScope::Provider, ref_id));
        }
        let project_id = if scope == TemplateScope::Project { ref_id } else { data.project_id };
        if project_id.is_some() {
            chain.push((TemplateScope::Project, project_id));
        }
        chain.push((TemplateScope::Global, None));
        chain
    }

    async fn effective_body(
        &self,
        scope: TemplateScope,
        ref_id: Option<i64>,
        template_type: &str,
        role: &str,
        data: &PromptData,
    ) -> Result<String> {
        for (scope, ref_id) in Self::lookup_chain(scope, ref_id, data) {
            match self
                .templates
                .get_effective_template(scope, ref_id, template_type, role)
                .await
            {
                Ok(Some(t)) if !t.body.trim().is_empty() => {
                    debug!("Using {} template for {}/{}", scope, template_type, role);
                    return Ok(t.body);
                }
                Ok(_) => {}
                Err(e) => warn!("Template lookup failed for {} scope: {}", scope, e),
            }
        }

        builtin_template(template_type, role)
            .map(str::to_string)
            .ok_or_else(|| anyhow!("no template for {}/{}", template_type, role))
    }
}

#[async_trait]
impl PromptRenderer for TemplatePromptRenderer {
    async fn render(
        &self,
        scope: TemplateScope,
        ref_id: Option<i64>,
        template_type: &str,
        role: &str,
        data: &PromptData,
    ) -> Result<String> {
        let body = self.effective_body(scope, ref_id, template_type, role, data).await?;
        render_template(&body, data)
    }
}
