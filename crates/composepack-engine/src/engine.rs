//! Template engine based on MiniJinja

use std::collections::BTreeMap;

use composepack_core::{Chart, RenderContext};
use minijinja::Environment;
use tracing::warn;

use crate::env_object;
use crate::error::{EngineError, Result, TemplateError};
use crate::files_object;
use crate::filters;
use crate::functions;

/// Template engine builder
pub struct EngineBuilder {
    strict_mode: bool,
}

impl Default for EngineBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl EngineBuilder {
    pub fn new() -> Self {
        Self { strict_mode: true }
    }

    /// Set strict mode (fail on undefined variables)
    pub fn strict(mut self, strict: bool) -> Self {
        self.strict_mode = strict;
        self
    }

    pub fn build(self) -> Engine {
        Engine::new(self.strict_mode)
    }
}

/// The template engine
pub struct Engine {
    strict_mode: bool,
}

impl Engine {
    /// Create a new engine. Strict mode makes references to undefined
    /// variables render errors instead of empty strings.
    pub fn new(strict_mode: bool) -> Self {
        Self { strict_mode }
    }

    pub fn builder() -> EngineBuilder {
        EngineBuilder::new()
    }

    /// Create a configured MiniJinja environment
    fn create_environment(&self) -> Environment<'static> {
        let mut env = Environment::new();

        if self.strict_mode {
            env.set_undefined_behavior(minijinja::UndefinedBehavior::Strict);
        } else {
            env.set_undefined_behavior(minijinja::UndefinedBehavior::Lenient);
        }

        env.add_filter("toyaml", filters::toyaml);
        env.add_filter("tojson", filters::tojson);
        env.add_filter("tojson_pretty", filters::tojson_pretty);
        env.add_filter("b64encode", filters::b64encode);
        env.add_filter("b64decode", filters::b64decode);
        env.add_filter("quote", filters::quote);
        env.add_filter("squote", filters::squote);
        env.add_filter("nindent", filters::nindent);
        env.add_filter("indent", filters::indent);
        env.add_filter("required", filters::required);
        env.add_filter("empty", filters::empty);
        env.add_filter("sha256", filters::sha256sum);
        env.add_filter("trimprefix", filters::trimprefix);
        env.add_filter("trimsuffix", filters::trimsuffix);

        env.add_function("fail", functions::fail);
        env.add_function("dict", functions::dict);
        env.add_function("coalesce", functions::coalesce);
        env.add_function("ternary", functions::ternary);
        env.add_function("now", functions::now);
        env.add_function("printf", functions::printf);

        env
    }

    /// Load a chart's helper templates into the environment under
    /// `helpers/<name>` so compose and file templates can reach them
    /// with `{% include %}` and `{% import %}`.
    fn register_helpers(&self, env: &mut Environment<'static>, chart: &Chart) -> Result<()> {
        for (name, source) in &chart.helper_templates {
            let template_name = format!("helpers/{}", name);
            env.add_template_owned(template_name.clone(), source.clone())
                .map_err(|e| {
                    EngineError::Template(TemplateError::from_minijinja(e, &template_name, source))
                })?;
        }
        Ok(())
    }

    /// Build the MiniJinja context for a render pass
    fn build_context(&self, ctx: &RenderContext) -> minijinja::Value {
        minijinja::context! {
            values => &ctx.values,
            env => env_object::create_env_value(ctx.env.clone()),
            release => &ctx.release,
            chart => &ctx.chart,
            files => files_object::create_files_value(ctx.files.clone()),
        }
    }

    /// Render a single template string
    pub fn render_string(
        &self,
        template: &str,
        ctx: &RenderContext,
        template_name: &str,
    ) -> Result<String> {
        let mut env = self.create_environment();

        env.add_template_owned(template_name.to_string(), template.to_string())
            .map_err(|e| {
                EngineError::Template(TemplateError::from_minijinja(e, template_name, template))
            })?;

        let tmpl = env.get_template(template_name).map_err(|e| {
            EngineError::Template(TemplateError::from_minijinja(e, template_name, template))
        })?;

        tmpl.render(self.build_context(ctx)).map_err(|e| {
            EngineError::Template(TemplateError::from_minijinja(e, template_name, template))
        })
    }

    /// Render every compose template of the chart, keyed by the
    /// template's suffix-stripped name. Fragments that render to only
    /// whitespace are dropped.
    pub fn render_compose_fragments(
        &self,
        chart: &Chart,
        ctx: &RenderContext,
    ) -> Result<BTreeMap<String, String>> {
        let mut env = self.create_environment();
        self.register_helpers(&mut env, chart)?;

        for (name, source) in &chart.compose_templates {
            env.add_template_owned(name.clone(), source.clone())
                .map_err(|e| {
                    EngineError::Template(TemplateError::from_minijinja(e, name, source))
                })?;
        }

        let context = self.build_context(ctx);
        let mut fragments = BTreeMap::new();

        for (name, source) in &chart.compose_templates {
            let tmpl = env.get_template(name).map_err(|e| {
                EngineError::Template(TemplateError::from_minijinja(e, name, source))
            })?;

            let rendered = tmpl.render(&context).map_err(|e| {
                EngineError::Template(TemplateError::from_minijinja(e, name, source))
            })?;

            if rendered.trim().is_empty() {
                warn!(template = %name, "compose template rendered empty, skipping");
                continue;
            }

            fragments.insert(name.clone(), rendered);
        }

        Ok(fragments)
    }

    /// Produce the release's companion file tree: the chart's static
    /// files plus every rendered file template. A rendered template
    /// wins over a static file at the same path.
    pub fn render_files(
        &self,
        chart: &Chart,
        ctx: &RenderContext,
    ) -> Result<BTreeMap<String, Vec<u8>>> {
        let mut env = self.create_environment();
        self.register_helpers(&mut env, chart)?;

        for (name, source) in &chart.file_templates {
            env.add_template_owned(name.clone(), source.clone())
                .map_err(|e| {
                    EngineError::Template(TemplateError::from_minijinja(e, name, source))
                })?;
        }

        let mut files: BTreeMap<String, Vec<u8>> = chart
            .static_files
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();

        let context = self.build_context(ctx);

        for (name, source) in &chart.file_templates {
            let tmpl = env.get_template(name).map_err(|e| {
                EngineError::Template(TemplateError::from_minijinja(e, name, source))
            })?;

            let rendered = tmpl.render(&context).map_err(|e| {
                EngineError::Template(TemplateError::from_minijinja(e, name, source))
            })?;

            if files.contains_key(name) {
                warn!(path = %name, "rendered file template shadows a static file");
            }
            files.insert(name.clone(), rendered.into_bytes());
        }

        Ok(files)
    }
}
