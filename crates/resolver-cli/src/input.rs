use crate::design::{DesignOptions, DesignSettings};
use anyhow::{ensure, Context};
use clap::ArgMatches;
use resolver_core::mass::VALID_AA;
use resolver_core::resolver::{Builder, Parameters};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Serialize, Clone, Debug)]
/// Actual resolver parameters - may include overrides or default values not set by user
pub struct Search {
    pub version: String,
    pub resolver: Parameters,
    pub fasta: String,
    pub identification_paths: Vec<String>,
    pub design: Option<DesignSettings>,
    pub output_paths: Vec<String>,

    #[serde(skip_serializing)]
    pub output_directory: PathBuf,
}

#[derive(Deserialize, Default, Debug)]
/// Input parameters deserialized from JSON file
pub struct Input {
    #[serde(default)]
    resolver: Builder,
    fasta: Option<String>,
    identification_paths: Option<Vec<String>>,
    /// Every `.json` file in this directory is used when no
    /// `identification_paths` are given
    identification_directory: Option<String>,
    design: Option<DesignOptions>,
    output_directory: Option<String>,
}

impl Input {
    pub fn from_arguments(matches: ArgMatches) -> anyhow::Result<Self> {
        let path = matches
            .get_one::<String>("parameters")
            .expect("required parameters");
        let mut input = Input::load(path)
            .with_context(|| format!("Failed to read parameters from `{path}`"))?;

        // Handle JSON configuration overrides
        if let Some(output_directory) = matches.get_one::<String>("output_directory") {
            log::trace!("overriding `output_directory` parameter.");
            input.output_directory = Some(output_directory.into());
        }
        if let Some(fasta) = matches.get_one::<String>("fasta") {
            log::trace!("overriding `fasta` parameter.");
            input.fasta = Some(fasta.into());
        }
        if let Some(design) = matches.get_one::<String>("design") {
            log::trace!("overriding `design.path` parameter.");
            input.design.get_or_insert_with(DesignOptions::default).path = Some(design.into());
        }
        if let Some(paths) = matches.get_many::<String>("identification_paths") {
            log::trace!("overriding `identification_paths` parameter.");
            input.identification_paths = Some(paths.into_iter().map(|p| p.into()).collect());
        }

        input.validate()?;
        Ok(input)
    }

    pub fn load<S: AsRef<std::path::Path>>(path: S) -> anyhow::Result<Self> {
        resolver_core::read_json(path).map_err(anyhow::Error::from)
    }

    fn validate(&self) -> anyhow::Result<()> {
        // avoid to later panic if these parameters are not set (but doesn't check if files exist)
        ensure!(
            self.fasta.is_some(),
            "`fasta` must be set. For more information try '--help'"
        );
        ensure!(
            self.identification_paths
                .as_ref()
                .map(|paths| !paths.is_empty())
                .unwrap_or(false)
                || self.identification_directory.is_some(),
            "`identification_paths` or `identification_directory` must be set. \
             For more information try '--help'"
        );
        if let Some(design) = &self.design {
            ensure!(
                design.path.is_some(),
                "`design.path` must be set when `design` is given"
            );
        }

        if let Some(enzyme) = &self.resolver.enzyme {
            if let Some(cleave) = &enzyme.cleave_at {
                ensure!(
                    cleave == "$" || cleave.bytes().all(|aa| VALID_AA.contains(&aa)),
                    "`resolver.enzyme.cleave_at` contains non-amino acid characters: `{}`",
                    cleave
                );
            }
            if let Some(restrict) = enzyme.restrict {
                ensure!(
                    restrict.is_ascii() && VALID_AA.contains(&(restrict as u8)),
                    "`resolver.enzyme.restrict` is not an amino acid: `{}`",
                    restrict
                );
            }
            if let (Some(min), Some(max)) = (enzyme.min_len, enzyme.max_len) {
                ensure!(
                    min <= max,
                    "`resolver.enzyme.min_len` ({}) exceeds `max_len` ({})",
                    min,
                    max
                );
            }
        }
        Ok(())
    }

    pub fn build(self) -> anyhow::Result<Search> {
        self.validate()?;
        let resolver = self.resolver.make_parameters();

        let identification_paths = match (self.identification_paths, self.identification_directory) {
            (Some(paths), _) if !paths.is_empty() => paths,
            (_, Some(directory)) => list_identifications(&directory)?,
            _ => anyhow::bail!("`identification_paths` must be provided"),
        };
        let fasta = self.fasta.context("`fasta` must be provided")?;

        let output_directory = match self.output_directory {
            Some(path) => {
                let path = PathBuf::from(path);
                std::fs::create_dir_all(&path)
                    .with_context(|| format!("Failed to create `{}`", path.display()))?;
                path
            }
            None => std::env::current_dir()?,
        };

        Ok(Search {
            version: clap::crate_version!().into(),
            resolver,
            fasta,
            identification_paths,
            design: self.design.map(Into::into),
            output_paths: Vec::new(),
            output_directory,
        })
    }
}

/// Sorted `.json` files in `directory`
fn list_identifications(directory: &str) -> anyhow::Result<Vec<String>> {
    let entries = std::fs::read_dir(directory)
        .with_context(|| format!("Failed to list `{}`", directory))?;
    let mut paths = Vec::new();
    for entry in entries {
        let path = entry?.path();
        if path.is_file() && path.extension().map_or(false, |ext| ext == "json") {
            paths.push(path.display().to_string());
        }
    }
    paths.sort();
    ensure!(
        !paths.is_empty(),
        "`identification_directory` `{}` contains no identification files",
        directory
    );
    Ok(paths)
}
