//! Quantitative experimental design: a delimited text file that maps input
//! files onto experimental settings. Inputs sharing a setting are merged and
//! resolved together.

use anyhow::{bail, Context};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Separator {
    #[default]
    Tab,
    Comma,
    Semicolon,
    Whitespace,
}

impl Separator {
    fn split<'a>(&self, line: &'a str) -> Vec<&'a str> {
        match self {
            Separator::Tab => line.split('\t').map(str::trim).collect(),
            Separator::Comma => line.split(',').map(str::trim).collect(),
            Separator::Semicolon => line.split(';').map(str::trim).collect(),
            Separator::Whitespace => line.split_whitespace().collect(),
        }
    }
}

#[derive(Deserialize, Default, Debug, Clone)]
pub struct DesignOptions {
    pub path: Option<String>,
    pub file_column: Option<String>,
    pub setting_column: Option<String>,
    pub separator: Option<Separator>,
}

#[derive(Serialize, Clone, Debug, PartialEq, Eq)]
pub struct DesignSettings {
    pub path: String,
    pub file_column: String,
    pub setting_column: String,
    pub separator: Separator,
}

impl From<DesignOptions> for DesignSettings {
    fn from(value: DesignOptions) -> Self {
        Self {
            path: value.path.unwrap_or_default(),
            file_column: value.file_column.unwrap_or_else(|| "File".into()),
            setting_column: value
                .setting_column
                .unwrap_or_else(|| "ExperimentalSetting".into()),
            separator: value.separator.unwrap_or_default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DesignRow {
    /// Base name of the file, see [`base_name`]
    pub file: String,
    pub setting: String,
}

/// A set of inputs that is resolved as one unit
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Batch {
    pub name: String,
    /// Indices into the input path list
    pub inputs: Vec<usize>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExperimentalDesign {
    pub rows: Vec<DesignRow>,
}

/// File name up to the first `.`, without any directory components
pub fn base_name(path: &str) -> &str {
    let name = Path::new(path)
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or(path);
    name.split('.').next().unwrap_or(name)
}

impl ExperimentalDesign {
    pub fn load(settings: &DesignSettings) -> anyhow::Result<Self> {
        let contents = std::fs::read_to_string(&settings.path)
            .with_context(|| format!("Failed to read experimental design `{}`", settings.path))?;
        Self::parse(&contents, settings)
            .with_context(|| format!("Invalid experimental design `{}`", settings.path))
    }

    pub fn parse(contents: &str, settings: &DesignSettings) -> anyhow::Result<Self> {
        let mut lines = contents
            .lines()
            .enumerate()
            .filter(|(_, line)| !line.trim().is_empty());

        let header = match lines.next() {
            Some((_, header)) => settings.separator.split(header),
            None => bail!("missing header line"),
        };

        let column = |name: &str| -> anyhow::Result<usize> {
            let mut matches = header.iter().enumerate().filter(|(_, h)| **h == name);
            match (matches.next(), matches.next()) {
                (Some((ix, _)), None) => Ok(ix),
                (None, _) => bail!("header does not contain a `{}` column", name),
                (Some(_), Some(_)) => bail!("header contains `{}` more than once", name),
            }
        };
        let file_ix = column(&settings.file_column)?;
        let setting_ix = column(&settings.setting_column)?;

        let mut rows = Vec::new();
        for (line_no, line) in lines {
            let fields = settings.separator.split(line);
            match (fields.get(file_ix), fields.get(setting_ix)) {
                (Some(file), Some(setting)) if !file.is_empty() && !setting.is_empty() => {
                    rows.push(DesignRow {
                        file: base_name(file).into(),
                        setting: (*setting).into(),
                    })
                }
                _ => bail!("line {} is missing a file or setting", line_no + 1),
            }
        }
        Ok(ExperimentalDesign { rows })
    }

    /// Group `paths` by experimental setting. Settings are ordered by their
    /// first row in the design; inputs that match no row are skipped.
    pub fn batches(&self, paths: &[String]) -> Vec<Batch> {
        let mut batches: Vec<Batch> = Vec::new();
        for row in &self.rows {
            if !batches.iter().any(|b| b.name == row.setting) {
                batches.push(Batch {
                    name: row.setting.clone(),
                    inputs: Vec::new(),
                });
            }
        }

        for (ix, path) in paths.iter().enumerate() {
            let name = base_name(path);
            match self.rows.iter().find(|row| row.file == name) {
                Some(row) => {
                    if let Some(batch) = batches.iter_mut().find(|b| b.name == row.setting) {
                        batch.inputs.push(ix);
                    }
                }
                None => log::warn!("`{}` has no entry in the experimental design, skipping", path),
            }
        }

        batches.retain(|batch| !batch.inputs.is_empty());
        batches
    }
}

/// Without an experimental design, every input is resolved on its own
pub fn single_batches(paths: &[String]) -> Vec<Batch> {
    paths
        .iter()
        .enumerate()
        .map(|(ix, path)| Batch {
            name: base_name(path).into(),
            inputs: vec![ix],
        })
        .collect()
}

#[cfg(test)]
mod test {
    use super::*;

    fn settings(separator: Separator) -> DesignSettings {
        DesignSettings {
            separator,
            ..DesignSettings::from(DesignOptions::default())
        }
    }

    #[test]
    fn merge_by_setting() -> anyhow::Result<()> {
        let design = ExperimentalDesign::parse(
            "Slice\tFile\tExperimentalSetting\n\
             1\tSILAC_2_1\tS1224\n\
             4\tSILAC_3_4\tD1224\n\
             2\tSILAC_10_2\tS1224\n\
             7\tSILAC_8_7\tS1224\n",
            &settings(Separator::Tab),
        )?;
        assert_eq!(design.rows.len(), 4);

        let paths = vec![
            "data/SILAC_2_1.json".to_string(),
            "data/SILAC_3_4.json".to_string(),
            "data/SILAC_10_2.json".to_string(),
            "data/SILAC_8_7_.json".to_string(),
        ];
        assert_eq!(
            design.batches(&paths),
            vec![
                Batch {
                    name: "S1224".into(),
                    inputs: vec![0, 2]
                },
                Batch {
                    name: "D1224".into(),
                    inputs: vec![1]
                },
            ]
        );
        Ok(())
    }

    #[test]
    fn separators_and_custom_columns() -> anyhow::Result<()> {
        let mut custom = settings(Separator::Semicolon);
        custom.file_column = "run".into();
        custom.setting_column = "condition".into();
        let design = ExperimentalDesign::parse("run;condition\na.mzML;ctrl\n", &custom)?;
        assert_eq!(
            design.rows,
            vec![DesignRow {
                file: "a".into(),
                setting: "ctrl".into()
            }]
        );

        let design = ExperimentalDesign::parse(
            "File   ExperimentalSetting\n  a   x\n",
            &settings(Separator::Whitespace),
        )?;
        assert_eq!(design.rows[0].setting, "x");

        let design =
            ExperimentalDesign::parse("File,ExperimentalSetting\nb,y\n", &settings(Separator::Comma))?;
        assert_eq!(design.rows[0].file, "b");
        Ok(())
    }

    #[test]
    fn invalid_header() {
        assert!(ExperimentalDesign::parse("", &settings(Separator::Tab)).is_err());
        assert!(ExperimentalDesign::parse("File\tOther\n", &settings(Separator::Tab)).is_err());
        assert!(ExperimentalDesign::parse(
            "File\tFile\tExperimentalSetting\n",
            &settings(Separator::Tab)
        )
        .is_err());
        assert!(ExperimentalDesign::parse(
            "File\tExperimentalSetting\nonly_file\n",
            &settings(Separator::Tab)
        )
        .is_err());
    }

    #[test]
    fn base_names() {
        assert_eq!(base_name("/tmp/run_1.idents.json"), "run_1");
        assert_eq!(base_name("run_2"), "run_2");
        assert_eq!(
            single_batches(&["x/a.json".into(), "b.json".into()])[1],
            Batch {
                name: "b".into(),
                inputs: vec![1]
            }
        );
    }
}
