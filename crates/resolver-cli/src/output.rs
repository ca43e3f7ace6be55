use crate::runner::{BatchResult, Runner};
use anyhow::Context;
use itertools::Itertools;
use resolver_core::graph::{PeptideIx, ProteinIx};
use resolver_core::resolver::Resolution;

fn optional_float(value: Option<f64>) -> Vec<u8> {
    match value {
        Some(value) => ryu::Buffer::new().format(value).as_bytes().to_vec(),
        None => Vec::new(),
    }
}

fn optional_index(value: Option<usize>) -> Vec<u8> {
    match value {
        Some(value) => itoa::Buffer::new().format(value).as_bytes().to_vec(),
        None => Vec::new(),
    }
}

fn protein_indices<'a, I: Iterator<Item = &'a ProteinIx>>(res: &Resolution, iter: I) -> String {
    iter.filter_map(|&ix| res.reindex.protein(ix)).join(";")
}

fn peptide_indices<'a, I: Iterator<Item = &'a PeptideIx>>(res: &Resolution, iter: I) -> String {
    iter.filter_map(|&ix| res.reindex.peptide(ix)).join(";")
}

fn protein_ids<'a, I: Iterator<Item = &'a ProteinIx>>(res: &Resolution, iter: I) -> String {
    iter.map(|&ix| &*res.graph[ix].identifier).join(";")
}

impl Runner {
    fn write_table(
        &self,
        file_name: &str,
        headers: Vec<&str>,
        records: Vec<csv::ByteRecord>,
    ) -> anyhow::Result<String> {
        let path = self.make_path(file_name);

        let mut wtr = csv::WriterBuilder::new()
            .delimiter(b'\t')
            .from_writer(vec![]);

        wtr.write_byte_record(&csv::ByteRecord::from(headers))?;
        for record in records {
            wtr.write_byte_record(&record)?;
        }

        wtr.flush()?;
        let bytes = wtr.into_inner()?;
        std::fs::write(&path, bytes)
            .with_context(|| format!("Failed to write `{}`", path.display()))?;
        Ok(path.display().to_string())
    }

    /// One row per MSD group, listed under its ISD group
    pub fn serialize_protein_groups(&self, result: &BatchResult) -> Vec<csv::ByteRecord> {
        let res = &result.resolution;
        let mut records = Vec::new();
        for isd in &res.isd_groups {
            for &msd_ix in &isd.msd_group_refs {
                let msd = &res.msd_groups[msd_ix];
                let experimental = msd
                    .peptide_refs
                    .iter()
                    .filter(|&&ix| res.graph[ix].experimental);

                let mut record = csv::ByteRecord::new();
                record.push_field(result.name.as_bytes());
                record.push_field(itoa::Buffer::new().format(msd.index).as_bytes());
                record.push_field(itoa::Buffer::new().format(isd.index).as_bytes());
                record.push_field(protein_indices(res, msd.protein_refs.iter()).as_bytes());
                record.push_field(peptide_indices(res, experimental).as_bytes());
                record.push_field(itoa::Buffer::new().format(msd.peptide_refs.len()).as_bytes());
                record.push_field(itoa::Buffer::new().format(isd.protein_refs.len()).as_bytes());
                record.push_field(protein_ids(res, isd.protein_refs.iter()).as_bytes());
                record.push_field(itoa::Buffer::new().format(msd.num_target).as_bytes());
                record.push_field(itoa::Buffer::new().format(msd.num_decoy).as_bytes());
                record.push_field(
                    itoa::Buffer::new()
                        .format(msd.num_target_and_decoy)
                        .as_bytes(),
                );
                record.push_field(&optional_float(msd.intensity));
                records.push(record);
            }
        }
        records
    }

    pub fn write_protein_groups(&self, results: &[BatchResult]) -> anyhow::Result<String> {
        let headers = vec![
            "batch",
            "msd_group",
            "isd_group",
            "protein_indices",
            "peptide_indices",
            "num_peptides_msd",
            "num_proteins_isd",
            "proteins_isd",
            "num_target",
            "num_decoy",
            "num_target_and_decoy",
            "intensity",
        ];
        let records = results
            .iter()
            .flat_map(|result| self.serialize_protein_groups(result))
            .collect();
        self.write_table("protein_groups.tsv", headers, records)
    }

    /// One row per active peptide, with the top hit of its first piece of evidence
    pub fn serialize_peptides(&self, result: &BatchResult) -> Vec<csv::ByteRecord> {
        let res = &result.resolution;
        let source = result.evidence.source();
        res.reindex
            .active_peptides
            .iter()
            .map(|&ix| {
                let peptide = &res.graph[ix];
                let evidence = peptide.evidence.first().copied();
                let identification = evidence.and_then(|r| source.peptide_identification(r));
                let hit = evidence.and_then(|r| source.peptide_hit(r));

                let mut record = csv::ByteRecord::new();
                record.push_field(result.name.as_bytes());
                record.push_field(&optional_index(peptide.msd_group_ref));
                record.push_field(&optional_index(peptide.isd_group_ref));
                record.push_field(optional_index(res.reindex.peptide(ix)).as_slice());
                record.push_field(protein_indices(res, peptide.protein_refs.iter()).as_bytes());
                record.push_field(protein_ids(res, peptide.protein_refs.iter()).as_bytes());
                record.push_field(peptide.sequence.as_bytes());
                record.push_field(hit.map(|h| h.sequence.as_str()).unwrap_or_default().as_bytes());
                match peptide.monoisotopic() {
                    Some(mass) => record.push_field(ryu::Buffer::new().format(mass).as_bytes()),
                    None => record.push_field(b""),
                }
                record.push_field(&optional_float(hit.map(|h| h.score)));
                match hit {
                    Some(hit) => record.push_field(itoa::Buffer::new().format(hit.charge).as_bytes()),
                    None => record.push_field(b""),
                }
                record.push_field(&optional_float(identification.and_then(|i| i.rt)));
                record.push_field(&optional_float(identification.and_then(|i| i.mz)));
                record.push_field(itoa::Buffer::new().format(peptide.evidence.len()).as_bytes());
                record.push_field(&optional_float(peptide.intensity));
                record.push_field(peptide.origin.as_deref().unwrap_or_default().as_bytes());
                record
            })
            .collect()
    }

    pub fn write_peptide_table(&self, results: &[BatchResult]) -> anyhow::Result<String> {
        let headers = vec![
            "batch",
            "msd_group",
            "isd_group",
            "peptide_index",
            "protein_indices",
            "proteins",
            "peptide",
            "modified_peptide",
            "peptide_mw",
            "score",
            "charge",
            "rt",
            "mz",
            "num_identifications",
            "intensity",
            "origin",
        ];
        let records = results
            .iter()
            .flat_map(|result| self.serialize_peptides(result))
            .collect();
        self.write_table("peptide_table.tsv", headers, records)
    }

    /// One row per active protein
    pub fn serialize_proteins(&self, result: &BatchResult) -> Vec<csv::ByteRecord> {
        let res = &result.resolution;
        res.reindex
            .active_proteins
            .iter()
            .map(|&ix| {
                let protein = &res.graph[ix];
                let description = &self.proteins[protein.source_ref].description;
                let experimental = protein
                    .peptide_refs
                    .iter()
                    .filter(|&&pep| res.graph[pep].experimental);

                let mut record = csv::ByteRecord::new();
                record.push_field(result.name.as_bytes());
                record.push_field(&optional_index(protein.msd_group_ref));
                record.push_field(&optional_index(protein.isd_group_ref));
                record.push_field(peptide_indices(res, experimental).as_bytes());
                record.push_field(&optional_index(res.reindex.protein(ix)));
                record.push_field(protein.identifier.as_bytes());
                record.push_field(description.as_bytes());
                record.push_field(protein.protein_type().as_str().as_bytes());
                record.push_field(&optional_index(protein.indistinguishable_group));
                record.push_field(protein_ids(res, protein.indistinguishable_refs.iter()).as_bytes());
                record.push_field(
                    itoa::Buffer::new()
                        .format(protein.num_experimental_peptides)
                        .as_bytes(),
                );
                record.push_field(&optional_float(protein.weight.map(f64::from)));
                record.push_field(ryu::Buffer::new().format(protein.coverage).as_bytes());
                record
            })
            .collect()
    }

    pub fn write_protein_table(&self, results: &[BatchResult]) -> anyhow::Result<String> {
        let headers = vec![
            "batch",
            "msd_group",
            "isd_group",
            "peptide_indices",
            "protein_index",
            "protein",
            "description",
            "protein_type",
            "indistinguishable_group",
            "indistinguishable_proteins",
            "num_peptides",
            "protein_mw",
            "coverage",
        ];
        let records = results
            .iter()
            .flat_map(|result| self.serialize_proteins(result))
            .collect();
        self.write_table("protein_table.tsv", headers, records)
    }

    pub fn write_statistics(&self, results: &[BatchResult]) -> anyhow::Result<String> {
        let headers = vec![
            "batch",
            "isd_groups",
            "msd_groups",
            "active_proteins",
            "primary_proteins",
            "indistinguishable_proteins",
            "active_peptides",
            "peptides_in_msd_groups",
            "num_target",
            "num_decoy",
            "num_target_and_decoy",
            "fdr_lower",
            "fdr_upper",
            "diagnostics",
        ];
        let records = results
            .iter()
            .map(|result| {
                let stats = result.resolution.statistics();
                let mut record = csv::ByteRecord::new();
                record.push_field(result.name.as_bytes());
                for count in [
                    stats.isd_groups,
                    stats.msd_groups,
                    stats.active_proteins,
                    stats.primary_proteins,
                    stats.indistinguishable_proteins,
                    stats.active_peptides,
                    stats.peptides_in_msd_groups,
                    stats.counts.target,
                    stats.counts.decoy,
                    stats.counts.target_and_decoy,
                ] {
                    record.push_field(itoa::Buffer::new().format(count).as_bytes());
                }
                record.push_field(&optional_float(stats.fdr_lower));
                record.push_field(&optional_float(stats.fdr_upper));
                record.push_field(
                    itoa::Buffer::new()
                        .format(stats.diagnostics + self.fasta_diagnostics)
                        .as_bytes(),
                );
                record
            })
            .collect();
        self.write_table("statistics.tsv", headers, records)
    }
}
