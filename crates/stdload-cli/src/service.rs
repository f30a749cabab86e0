use crate::config::Config;
use anyhow::{Context, Result};
use clap::ValueEnum;
use std::fmt::Write as _;
use stdload_catalog::{Catalog, ProductTable, StandardEntry};
use stdload_resolver::{audit, FsContentSource, LoadError, LoadResult, Loader, ParseError, Request};
use stdload_types::StrategyKind;
use tracing::{info, warn};

/// Output format of commands that support machine-readable output
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// Output format of `list`, which can also render an assistant prompt
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum ListFormat {
    #[default]
    Text,
    Json,
    Prompt,
}

/// Rendered command output plus whether the command succeeded
#[derive(Debug)]
pub struct Outcome {
    pub text: String,
    pub ok: bool,
}

/// Catalog, product table and content root opened from one configuration
pub struct Workspace {
    config: Config,
    catalog: Catalog,
    products: ProductTable,
    source: FsContentSource,
}

impl Workspace {
    /// Load the catalog and the product table named by `config`
    pub fn open(config: Config) -> Result<Self> {
        let manifest = config.catalog.manifest_path();
        let catalog = Catalog::from_path(&manifest)
            .with_context(|| format!("loading catalog {}", manifest.display()))?;

        let matrix = config.catalog.product_matrix_path();
        let products = if matrix.exists() {
            ProductTable::from_path(&matrix, &catalog)
                .with_context(|| format!("loading product matrix {}", matrix.display()))?
        } else {
            warn!(
                "Product matrix {} not found, continuing without products",
                matrix.display()
            );
            ProductTable::empty()
        };

        let source = FsContentSource::new(config.catalog.root.clone());
        info!(
            "Workspace ready: {} standards, {} sections",
            catalog.len(),
            catalog.section_count()
        );

        Ok(Self {
            config,
            catalog,
            products,
            source,
        })
    }

    fn loader(&self) -> Loader<'_, FsContentSource> {
        Loader::new(&self.catalog, &self.products, &self.source)
    }

    /// Resolve a request and render the result.
    ///
    /// One argument is parsed as request text, several as a list of atoms.
    /// The budget flag wins over the configured budget, which wins over a
    /// profile's default.
    pub fn load(
        &self,
        request: &[String],
        budget: Option<u64>,
        strategy: Option<&str>,
        format: OutputFormat,
    ) -> Result<String> {
        let request = match request {
            [text] => Request::Text(text.clone()),
            atoms => Request::Atoms(atoms.to_vec()),
        };
        let budget = budget.or(self.config.loading.budget);
        let strategy = strategy.unwrap_or(&self.config.loading.strategy);

        let result = self.loader().resolve(request, budget, Some(strategy))?;
        match format {
            OutputFormat::Json => Ok(serde_json::to_string_pretty(&result)?),
            OutputFormat::Text => Ok(render_load(&result)),
        }
    }

    /// Standards grouped by category
    pub fn list(&self, category: Option<&str>, format: ListFormat) -> Result<String> {
        let groups = self.catalog.by_category(category);
        match format {
            ListFormat::Json => return Ok(serde_json::to_string_pretty(&groups)?),
            ListFormat::Prompt => return Ok(self.catalog.generate_summary(category)),
            ListFormat::Text => {}
        }

        if groups.is_empty() {
            return Ok(match category {
                Some(name) => format!("No standards in category '{name}'"),
                None => "The catalog is empty".to_string(),
            });
        }

        let mut out = String::new();
        for (name, entries) in groups {
            let _ = writeln!(out, "{name}:");
            for entry in entries {
                let _ = writeln!(out, "  {}", entry.to_summary());
            }
        }
        Ok(out)
    }

    /// Sections, dependencies and estimates of one standard
    pub fn info(&self, code: &str) -> Result<String> {
        let entry = self.catalog.get(code).ok_or_else(|| {
            LoadError::Parse(ParseError::UnknownStandard {
                code: code.to_string(),
            })
        })?;
        Ok(render_entry(entry))
    }

    /// Standards matching a keyword
    pub fn discover(&self, keyword: &str) -> String {
        let hits = self.catalog.search(keyword);
        if hits.is_empty() {
            return format!("No standards match '{keyword}'");
        }
        let mut out = format!("Standards matching '{keyword}':\n");
        for entry in hits {
            let _ = writeln!(out, "{}", entry.to_summary());
        }
        out
    }

    /// Products, stack presets, profiles and the built-in strategies
    pub fn products(&self) -> String {
        let mut out = String::from("Products:\n");
        for product in self.products.products().filter(|p| !p.is_preset()) {
            let _ = writeln!(out, "  {}: {}", product.name, product.description);
            let _ = writeln!(out, "    {}", product.to_request());
        }

        out.push_str("\nStack presets:\n");
        for preset in self.products.products().filter(|p| p.is_preset()) {
            let uses = preset.uses.as_deref().unwrap_or_default();
            let _ = writeln!(
                out,
                "  {} (uses {}): {}",
                preset.name, uses, preset.description
            );
            let _ = writeln!(out, "    {}", preset.to_request());
        }

        out.push_str("\nProfiles:\n");
        for profile in self.products.profiles() {
            let mut details = vec![format!("strategy {}", profile.strategy)];
            if let Some(floor) = profile.min_priority {
                details.push(format!("min priority {floor}"));
            }
            if let Some(budget) = profile.budget {
                details.push(format!("budget {budget}"));
            }
            let _ = writeln!(
                out,
                "  {}: {} ({})",
                profile.name,
                profile.description,
                details.join(", ")
            );
        }

        let strategies: Vec<&str> = StrategyKind::ALL.iter().map(|kind| kind.as_str()).collect();
        let _ = writeln!(out, "\nStrategies: {}", strategies.join(", "));
        out
    }

    /// What a product expands to and what loading it would bring in
    pub fn recommend(&self, name: &str) -> Result<String> {
        let name = name.strip_prefix("product:").unwrap_or(name);
        let product = self.products.product(name).ok_or_else(|| {
            LoadError::Parse(ParseError::UnknownProduct {
                name: name.to_string(),
            })
        })?;

        let strategy = self.config.loading.strategy.as_str();
        let result = self
            .loader()
            .resolve(format!("product:{name}"), None, Some(strategy))?;

        let mut out = format!(
            "product:{} - {}\n\nExpands to:\n",
            product.name, product.description
        );
        for atom in &product.atoms {
            let _ = writeln!(out, "  {atom}");
        }
        let _ = writeln!(
            out,
            "\nWith strategy '{}' this loads {} sections ({} tokens):",
            result.strategy,
            result.included.len(),
            result.total_tokens
        );
        for unit in &result.included {
            let _ = writeln!(
                out,
                "  {}:{} [{}, {} tokens]",
                unit.code, unit.section, unit.origin, unit.tokens
            );
        }
        let _ = writeln!(out, "\nEquivalent: stdload load \"{}\"", product.to_request());
        Ok(out)
    }

    /// Summary of a successful catalog and product table load
    pub fn validate(&self) -> String {
        format!(
            "Catalog OK (schema v{}): {} standards, {} sections, {} content files under {}\n\
             Product table OK: {} products and presets, {} profiles",
            self.catalog.version(),
            self.catalog.len(),
            self.catalog.section_count(),
            self.catalog.content_files().len(),
            self.source.root().display(),
            self.products.products().count(),
            self.products.profiles().count()
        )
    }

    /// Check that every section can be located and report token drift
    pub fn audit(&self, drift_percent: Option<u64>, format: OutputFormat) -> Result<Outcome> {
        let threshold = drift_percent.unwrap_or(self.config.audit.drift_percent);
        let report = audit(&self.catalog, &self.source, threshold);
        let ok = report.is_clean();

        if format == OutputFormat::Json {
            return Ok(Outcome {
                text: serde_json::to_string_pretty(&report)?,
                ok,
            });
        }

        let mut text = format!("Checked {} sections\n", report.sections_checked);
        for missing in &report.missing {
            let _ = writeln!(
                text,
                "MISSING {} in {}: {}",
                missing.unit,
                missing.file.display(),
                missing.reason
            );
        }
        for drift in &report.drift {
            let _ = writeln!(
                text,
                "WARNING {} declares {} tokens, measured {} ({:+}%)",
                drift.unit,
                drift.declared,
                drift.measured,
                drift.percent()
            );
        }
        if ok && report.drift.is_empty() {
            text.push_str("All sections located, estimates within tolerance\n");
        }
        Ok(Outcome { text, ok })
    }
}

fn render_load(result: &LoadResult) -> String {
    let budget = result
        .budget_tokens
        .map_or_else(|| "unlimited".to_string(), |b| b.to_string());
    let mut out = format!(
        "<!-- stdload: strategy={} budget={} total={} included={} skipped={} -->\n\n",
        result.strategy,
        budget,
        result.total_tokens,
        result.included.len(),
        result.skipped.len()
    );
    out.push_str(&result.to_markdown());
    out.push('\n');

    if !result.skipped.is_empty() || !result.diagnostics.is_empty() {
        out.push('\n');
    }
    for skipped in &result.skipped {
        let _ = writeln!(
            out,
            "<!-- skipped {}:{} ({}, {} tokens) -->",
            skipped.code, skipped.section, skipped.reason, skipped.tokens
        );
    }
    for note in &result.diagnostics {
        let _ = writeln!(out, "<!-- note: {note} -->");
    }
    out
}

fn render_entry(entry: &StandardEntry) -> String {
    let mut out = format!("{}: {}\n", entry.code, entry.full_name);
    let _ = writeln!(out, "File: {}", entry.file.display());
    if let Some(category) = &entry.category {
        let _ = writeln!(out, "Category: {category}");
    }
    if !entry.tags.is_empty() {
        let _ = writeln!(out, "Tags: {}", entry.tags.join(", "));
    }
    let _ = writeln!(
        out,
        "Estimate: {} tokens across {} sections",
        entry.section_tokens(),
        entry.sections.len()
    );
    if entry.token_estimate > 0 {
        let _ = writeln!(out, "Whole document: ~{} tokens", entry.token_estimate);
    }

    out.push_str("\nSections:\n");
    for section in &entry.sections {
        let _ = write!(
            out,
            "  {:<16} {:>6} tokens  {:<8}",
            section.key, section.tokens, section.priority
        );
        if section.description.is_empty() {
            out.push('\n');
        } else {
            let _ = writeln!(out, "  {}", section.description);
        }
    }

    let mut edges: Vec<String> = entry
        .dependencies
        .labelled()
        .map(|(label, target)| format!("  {label} {target}"))
        .collect();
    for section in &entry.sections {
        edges.extend(
            section
                .dependencies
                .labelled()
                .map(|(label, target)| format!("  {}: {label} {target}", section.key)),
        );
    }
    if !edges.is_empty() {
        out.push_str("\nDependencies:\n");
        for edge in edges {
            out.push_str(&edge);
            out.push('\n');
        }
    }
    out
}
