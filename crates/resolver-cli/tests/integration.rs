use resolver_cli::input::Input;
use resolver_cli::runner::Runner;
use std::path::Path;

fn read_table(path: &str) -> anyhow::Result<Vec<csv::StringRecord>> {
    let mut rdr = csv::ReaderBuilder::new()
        .delimiter(b'\t')
        .from_path(path)?;
    Ok(rdr.records().collect::<Result<Vec<_>, _>>()?)
}

fn column(path: &str, name: &str) -> anyhow::Result<Vec<String>> {
    let mut rdr = csv::ReaderBuilder::new()
        .delimiter(b'\t')
        .from_path(path)?;
    let ix = rdr
        .headers()?
        .iter()
        .position(|h| h == name)
        .ok_or_else(|| anyhow::anyhow!("missing column `{name}`"))?;
    let mut values = Vec::new();
    for record in rdr.records() {
        values.push(record?[ix].to_string());
    }
    Ok(values)
}

fn input(output_directory: &Path, extra: serde_json::Value) -> anyhow::Result<Input> {
    let mut value = serde_json::json!({
        "resolver": {
            "enzyme": { "missed_cleavages": 0, "min_len": 4, "max_len": 50 }
        },
        "fasta": "../../tests/proteins.fasta",
        "identification_paths": ["../../tests/identifications.json"],
        "output_directory": output_directory,
    });
    if let (Some(value), Some(extra)) = (value.as_object_mut(), extra.as_object()) {
        value.extend(extra.clone());
    }
    Ok(serde_json::from_value(value)?)
}

#[test]
fn parameter_file() -> anyhow::Result<()> {
    let input = Input::load("../../tests/parameters.json")?;
    let search = input.build()?;
    assert_eq!(search.fasta, "proteins.fasta");
    assert_eq!(search.resolver.enzyme.min_len, Some(4));
    Ok(())
}

#[test]
fn identifications() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let search = input(dir.path(), serde_json::json!({}))?.build()?;
    let runner = Runner::new(search)?;
    assert_eq!(runner.proteins.len(), 5);

    let search = runner.run(1)?;
    assert_eq!(search.output_paths.len(), 5);
    for path in &search.output_paths {
        assert!(Path::new(path).exists(), "{path} was not written");
    }

    let proteins = dir.path().join("protein_table.tsv");
    let proteins = proteins.to_str().unwrap();
    assert_eq!(
        column(proteins, "protein")?,
        vec![
            "sp|P10001|PROT1_HUMAN",
            "sp|P10002|PROT2_HUMAN",
            "sp|P10003|PROT3_HUMAN"
        ]
    );
    assert_eq!(
        column(proteins, "protein_type")?,
        vec!["primary", "secondary", "primary"]
    );
    assert_eq!(column(proteins, "description")?[0], "Protein one OS=Homo sapiens");

    let peptides = dir.path().join("peptide_table.tsv");
    let peptides = peptides.to_str().unwrap();
    let sequences = column(peptides, "peptide")?;
    assert_eq!(sequences.len(), 4);
    assert!(sequences.contains(&"YYYYK".to_string()));
    // The orphan peptide maps to no protein
    let orphan = sequences.iter().position(|s| s == "YYYYK").unwrap();
    assert_eq!(column(peptides, "proteins")?[orphan], "");
    assert_eq!(column(peptides, "batch")?[0], "identifications");

    let groups = dir.path().join("protein_groups.tsv");
    assert_eq!(read_table(groups.to_str().unwrap())?.len(), 3);

    let stats = dir.path().join("statistics.tsv");
    let stats = stats.to_str().unwrap();
    assert_eq!(column(stats, "isd_groups")?, vec!["4"]);
    assert_eq!(column(stats, "msd_groups")?, vec!["3"]);
    assert_eq!(column(stats, "num_target")?, vec!["2"]);
    assert_eq!(column(stats, "num_decoy")?, vec!["1"]);
    assert_eq!(column(stats, "num_target_and_decoy")?, vec!["0"]);
    assert_eq!(column(stats, "fdr_lower")?, vec!["0.5"]);
    assert_eq!(column(stats, "diagnostics")?, vec!["2"]);
    Ok(())
}

#[test]
fn experimental_design() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let search = input(
        dir.path(),
        serde_json::json!({
            "identification_paths": [
                "../../tests/identifications.json",
                "../../tests/consensus.json",
            ],
            "design": { "path": "../../tests/design.tsv" },
        }),
    )?
    .build()?;
    Runner::new(search)?.run(2)?;

    let stats = dir.path().join("statistics.tsv");
    let stats = stats.to_str().unwrap();
    assert_eq!(column(stats, "batch")?, vec!["S1", "S2"]);
    assert_eq!(column(stats, "msd_groups")?, vec!["3", "1"]);
    // LLLLR was reported as both target and decoy in the consensus input
    assert_eq!(column(stats, "num_target_and_decoy")?, vec!["0", "2"]);

    let groups = dir.path().join("protein_groups.tsv");
    let groups = groups.to_str().unwrap();
    let batches = column(groups, "batch")?;
    let intensity = column(groups, "intensity")?;
    let consensus = batches.iter().position(|b| b == "S2").unwrap();
    assert_eq!(intensity[consensus], "2000.0");

    let proteins = dir.path().join("protein_table.tsv");
    let proteins = proteins.to_str().unwrap();
    let types = column(proteins, "protein_type")?;
    let batches = column(proteins, "batch")?;
    let consensus = types
        .iter()
        .zip(&batches)
        .filter(|(_, batch)| *batch == "S2")
        .map(|(ty, _)| ty.as_str())
        .collect::<Vec<_>>();
    assert_eq!(consensus, vec!["secondary", "primary"]);
    Ok(())
}

#[test]
fn design_without_matches() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let search = input(
        dir.path(),
        serde_json::json!({
            "identification_paths": ["../../tests/proteins.fasta"],
            "design": { "path": "../../tests/design.tsv" },
        }),
    )?
    .build()?;
    assert!(Runner::new(search)?.run(1).is_err());
    Ok(())
}
