use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use razao_import::{ImportOutcome, StatementImporter};
use tokio::task::JoinSet;

use crate::config::OutputFormat;
use crate::render;

/// Read one file and run it through the importer on a blocking thread.
pub async fn import_file(
    importer: Arc<StatementImporter>,
    path: &Path,
) -> anyhow::Result<ImportOutcome> {
    let data = tokio::fs::read(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;

    let outcome = tokio::task::spawn_blocking(move || importer.process_bytes(&data))
        .await
        .context("Import task panicked")?
        .with_context(|| format!("Failed to import {}", path.display()))?;
    Ok(outcome)
}

/// Import every file concurrently and print results in argument order.
/// Returns the number of files that failed.
pub async fn import(
    importer: Arc<StatementImporter>,
    paths: Vec<PathBuf>,
    format: OutputFormat,
) -> usize {
    let mut tasks = JoinSet::new();
    for (index, path) in paths.iter().cloned().enumerate() {
        let importer = Arc::clone(&importer);
        tasks.spawn(async move {
            let result = import_file(importer, &path).await;
            (index, result)
        });
    }

    let mut results: Vec<Option<anyhow::Result<ImportOutcome>>> =
        paths.iter().map(|_| None).collect();
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok((index, result)) => results[index] = Some(result),
            Err(e) => tracing::error!("Import task failed: {e}"),
        }
    }

    let mut failures = 0;
    for (path, result) in paths.iter().zip(results) {
        let source = path.display().to_string();
        match result {
            Some(Ok(outcome)) => {
                let rendered = match format {
                    OutputFormat::Text => render::text(&source, &outcome).map_err(anyhow::Error::from),
                    OutputFormat::Json => render::json(&source, &outcome)
                        .map(|json| json + "\n")
                        .map_err(anyhow::Error::from),
                };
                match rendered {
                    Ok(report) => print!("{report}"),
                    Err(e) => {
                        failures += 1;
                        tracing::error!("Failed to render {source}: {e}");
                    }
                }
            }
            Some(Err(e)) => {
                failures += 1;
                tracing::error!("{e:#}");
                eprintln!("{source}: {e:#}");
            }
            None => failures += 1,
        }
    }
    failures
}

pub async fn sanitize(path: &Path) -> anyhow::Result<String> {
    let data = tokio::fs::read(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let text = razao_import::pipeline::decode_text(&data);
    razao_import::import::sanitize_ofx(&text)
        .with_context(|| format!("Failed to sanitize {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const STATEMENT: &str = "OFXHEADER:100\n\n<OFX><BANKACCTFROM><BANKID>1<ACCTID>42<ACCTTYPE>SAVINGS\
                             </BANKACCTFROM><STMTTRN><TRNTYPE>INT<DTPOSTED>20240201<TRNAMT>3,10\
                             <FITID>j1<NAME>RENDIMENTO</STMTTRN></OFX>";

    fn file_with(body: &[u8]) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(body).unwrap();
        file
    }

    #[tokio::test]
    async fn imports_a_file_from_disk() {
        let file = file_with(STATEMENT.as_bytes());
        let outcome = import_file(Arc::new(StatementImporter::default()), file.path())
            .await
            .unwrap();
        assert_eq!(outcome.document.account.account_id, "42");
        assert_eq!(outcome.report.total_transactions, 1);
        assert_eq!(outcome.document.transactions[0].amount.to_string(), "3.10");
    }

    #[tokio::test]
    async fn failures_are_counted_per_file() {
        let good = file_with(STATEMENT.as_bytes());
        let bad = file_with(b"not an ofx file");
        let missing = good.path().with_extension("absent");

        let failures = import(
            Arc::new(StatementImporter::default()),
            vec![good.path().to_path_buf(), bad.path().to_path_buf(), missing],
            OutputFormat::Json,
        )
        .await;
        assert_eq!(failures, 2);
    }

    #[tokio::test]
    async fn import_error_names_the_file() {
        let bad = file_with(b"<OFX></OFX>");
        let err = import_file(Arc::new(StatementImporter::default()), bad.path())
            .await
            .unwrap_err();
        assert!(err.to_string().starts_with("Failed to import"));
    }

    #[tokio::test]
    async fn sanitize_reads_and_cleans() {
        let file = file_with(STATEMENT.as_bytes());
        let sanitized = sanitize(file.path()).await.unwrap();
        assert!(sanitized.starts_with("<OFX>"));
        assert!(sanitized.contains("<ACCTID>42</ACCTID>"));
    }
}
