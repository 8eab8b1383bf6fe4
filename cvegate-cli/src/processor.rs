//! Parallel record processor: reader -> N matcher workers -> writer.
//!
//! The reader pulls delimited records from the input stream and feeds a
//! bounded channel. Worker tasks parse the CPE column, query the match
//! cache and fan each match out into one output record. A single writer
//! task serializes results to the output stream. Channels close to
//! signal shutdown; output order reflects completion order.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::{Mutex, mpsc};

use cvegate_cvefeed::{MatchCache, MatchResult, Vulnerability};
use cvegate_wfn::{Attributes, bind_uri};

use crate::columns::DropColumns;
use crate::error::CliError;

/// Capacity of the record and output channels.
const CHANNEL_CAPACITY: usize = 1024;

/// Processor configuration. All column positions are 1-based; zero or
/// `None` disables the corresponding output column.
#[derive(Debug, Clone, Default)]
pub struct ProcessorConfig {
    /// Number of matcher worker tasks.
    pub workers: usize,
    /// Input column holding the CPE list (required).
    pub cpes_at: usize,
    /// Output column for the CVE identifier (required).
    pub cves_at: usize,
    /// Output column for the matching-CPE list; 0 suppresses it.
    pub matches_at: usize,
    /// Output column for the CWE list.
    pub cwes_at: Option<usize>,
    /// Output column for max(CVSS v2, CVSS v3).
    pub cvss_at: Option<usize>,
    /// Output column for the CVSS v2 base score.
    pub cvss2_at: Option<usize>,
    /// Output column for the CVSS v3 base score.
    pub cvss3_at: Option<usize>,
    /// Provider tag and its output column.
    pub provider: Option<(String, usize)>,
    /// Input columns to drop before the insertions.
    pub drop: DropColumns,
    /// Input field delimiter.
    pub in_field_sep: char,
    /// Input inner (list) delimiter.
    pub in_list_sep: char,
    /// Output field delimiter.
    pub out_field_sep: char,
    /// Output inner (list) delimiter.
    pub out_list_sep: char,
}

impl ProcessorConfig {
    /// Validate the column layout before processing begins.
    pub fn validate(&self) -> Result<(), CliError> {
        if self.workers < 1 {
            return Err(CliError::Config("nproc must be at least 1".to_owned()));
        }
        if self.cpes_at < 1 {
            return Err(CliError::Config("cpe column is required".to_owned()));
        }
        if self.cves_at < 1 {
            return Err(CliError::Config("cve column is required".to_owned()));
        }
        for (name, at) in [
            ("cwe", self.cwes_at),
            ("cvss", self.cvss_at),
            ("cvss2", self.cvss2_at),
            ("cvss3", self.cvss3_at),
        ] {
            if at == Some(0) {
                return Err(CliError::Config(format!("{name} column must be positive")));
            }
        }
        if let Some((_, at)) = &self.provider
            && *at < 1
        {
            return Err(CliError::Config("provider column must be positive".to_owned()));
        }
        Ok(())
    }
}

/// Counters reported after a processing run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ProcessStats {
    /// Input records consumed by the workers.
    pub records_in: u64,
    /// Output records written.
    pub records_out: u64,
    /// Output records lost to write errors.
    pub write_errors: u64,
}

/// The streaming pipeline around a shared [`MatchCache`].
pub struct Processor {
    cache: Arc<MatchCache>,
    config: Arc<ProcessorConfig>,
}

impl Processor {
    /// Create a processor. The configuration must already be validated.
    pub fn new(cache: Arc<MatchCache>, config: ProcessorConfig) -> Self {
        Self {
            cache,
            config: Arc::new(config),
        }
    }

    /// Drive the input stream to completion and return the output
    /// writer together with run statistics.
    pub async fn run<R, W>(&self, input: R, output: W) -> Result<(W, ProcessStats), CliError>
    where
        R: AsyncRead + Unpin,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let (record_tx, record_rx) = mpsc::channel::<Vec<String>>(CHANNEL_CAPACITY);
        let record_rx = Arc::new(Mutex::new(record_rx));
        let (out_tx, mut out_rx) = mpsc::channel::<String>(CHANNEL_CAPACITY);
        let processed = Arc::new(AtomicU64::new(0));

        // Writer: single consumer of the output channel.
        let writer_task = tokio::spawn(async move {
            let mut output = output;
            let mut written = 0u64;
            let mut write_errors = 0u64;
            while let Some(line) = out_rx.recv().await {
                match write_line(&mut output, &line).await {
                    Ok(()) => written += 1,
                    Err(e) => {
                        tracing::error!(error = %e, "write error");
                        write_errors += 1;
                    }
                }
            }
            if let Err(e) = output.flush().await {
                tracing::error!(error = %e, "write error on flush");
            }
            (output, written, write_errors)
        });

        // Workers: shared consumers of the record channel.
        let mut worker_tasks = Vec::with_capacity(self.config.workers);
        for _ in 0..self.config.workers {
            let record_rx = Arc::clone(&record_rx);
            let out_tx = out_tx.clone();
            let cache = Arc::clone(&self.cache);
            let config = Arc::clone(&self.config);
            let processed = Arc::clone(&processed);
            worker_tasks.push(tokio::spawn(async move {
                loop {
                    let record = { record_rx.lock().await.recv().await };
                    let Some(record) = record else { break };
                    process_record(record, &cache, &config, &out_tx, &processed).await;
                }
            }));
        }
        drop(out_tx);

        // Reader: the current task feeds the record channel.
        let mut lines = BufReader::new(input).lines();
        loop {
            match lines.next_line().await {
                Ok(Some(line)) => {
                    let fields: Vec<String> =
                        line.split(self.config.in_field_sep).map(str::to_owned).collect();
                    if record_tx.send(fields).await.is_err() {
                        break;
                    }
                }
                Ok(None) => break,
                Err(e) => {
                    tracing::error!(error = %e, "read error");
                    break;
                }
            }
        }
        drop(record_tx);

        for task in worker_tasks {
            task.await.map_err(|e| CliError::Task(e.to_string()))?;
        }
        let (output, written, write_errors) = writer_task
            .await
            .map_err(|e| CliError::Task(e.to_string()))?;

        let stats = ProcessStats {
            records_in: processed.load(Ordering::Relaxed),
            records_out: written,
            write_errors,
        };
        tracing::info!(
            records_in = stats.records_in,
            records_out = stats.records_out,
            "processing complete"
        );
        Ok((output, stats))
    }
}

async fn write_line<W: AsyncWrite + Unpin>(output: &mut W, line: &str) -> std::io::Result<()> {
    output.write_all(line.as_bytes()).await?;
    output.write_all(b"\n").await
}

async fn process_record(
    mut fields: Vec<String>,
    cache: &MatchCache,
    config: &ProcessorConfig,
    out_tx: &mpsc::Sender<String>,
    processed: &AtomicU64,
) {
    let cpes_at = config.cpes_at - 1;
    if cpes_at >= fields.len() {
        tracing::warn!(columns = fields.len(), "not enough fields in input record");
        return;
    }

    let uris: Vec<String> = fields[cpes_at]
        .split(config.in_list_sep)
        .map(str::to_owned)
        .collect();
    let mut cpes: Vec<Option<Attributes>> = Vec::with_capacity(uris.len());
    for uri in &uris {
        match Attributes::parse(uri) {
            Ok(attrs) => cpes.push(Some(attrs)),
            Err(e) => {
                tracing::warn!(uri = %uri, error = %e, "failed to parse cpe uri");
                cpes.push(None);
            }
        }
    }
    // Rewrite the CPE column with the output list delimiter.
    fields[cpes_at] = uris.join(&config.out_list_sep.to_string());

    let results = cache.get(&cpes).await;
    for result in results.iter() {
        let line = render_match(&fields, result, config);
        if out_tx.send(line).await.is_err() {
            tracing::error!("output channel closed, dropping match");
            return;
        }
    }

    let n = processed.fetch_add(1, Ordering::Relaxed) + 1;
    if n.is_multiple_of(10_000) {
        tracing::info!(records = n, "records processed");
    } else if n.is_multiple_of(1_000) {
        tracing::debug!(records = n, "records processed");
    }
}

fn render_match(fields: &[String], result: &MatchResult, config: &ProcessorConfig) -> String {
    let list_sep = config.out_list_sep.to_string();
    let mut insertions = vec![(config.cves_at - 1, result.cve().to_owned())];
    if config.matches_at > 0 {
        let joined = result
            .cpes
            .iter()
            .map(bind_uri)
            .collect::<Vec<_>>()
            .join(&list_sep);
        insertions.push((config.matches_at - 1, joined));
    }
    if let Some(at) = config.cwes_at {
        insertions.push((at - 1, result.record.cwes().join(&list_sep)));
    }
    if let Some(at) = config.cvss_at {
        insertions.push((at - 1, format!("{:.1}", result.record.cvss_base_score())));
    }
    if let Some(at) = config.cvss2_at {
        insertions.push((at - 1, format!("{:.1}", result.record.cvss_v2_base_score())));
    }
    if let Some(at) = config.cvss3_at {
        insertions.push((at - 1, format!("{:.1}", result.record.cvss_v3_base_score())));
    }
    if let Some((tag, at)) = &config.provider {
        insertions.push((at - 1, tag.clone()));
    }
    config
        .drop
        .splice(fields, insertions)
        .join(&config.out_field_sep.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use cvegate_cvefeed::Dictionary;

    fn base_config() -> ProcessorConfig {
        ProcessorConfig {
            workers: 1,
            cpes_at: 1,
            cves_at: 2,
            in_field_sep: '\t',
            in_list_sep: ',',
            out_field_sep: '\t',
            out_list_sep: ',',
            ..ProcessorConfig::default()
        }
    }

    #[test]
    fn validate_accepts_minimal_config() {
        assert!(base_config().validate().is_ok());
    }

    #[test]
    fn validate_rejects_missing_columns() {
        let mut config = base_config();
        config.cpes_at = 0;
        assert!(config.validate().is_err());

        let mut config = base_config();
        config.cves_at = 0;
        assert!(config.validate().is_err());

        let mut config = base_config();
        config.workers = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_zero_optional_columns() {
        let mut config = base_config();
        config.cwes_at = Some(0);
        assert!(config.validate().is_err());

        let mut config = base_config();
        config.provider = Some(("nvd".to_owned(), 0));
        assert!(config.validate().is_err());
    }

    /// windows 10 전용 CVE 하나와 windows 10 AND flash 인 CVE 하나
    const TWO_VULN_FEED: &str = r#"{
        "CVE_Items": [
            {
                "cve": { "CVE_data_meta": { "ID": "CVE-2016-0165" } },
                "configurations": {
                    "nodes": [
                        {
                            "operator": "OR",
                            "cpe_match": [
                                { "vulnerable": true, "cpe22Uri": "cpe:/o:microsoft:windows_10:-" },
                                { "vulnerable": true, "cpe22Uri": "cpe:/o:microsoft:windows_10:1511" },
                                { "vulnerable": true, "cpe22Uri": "cpe:/o:microsoft:windows_7::sp1" },
                                { "vulnerable": true, "cpe22Uri": "cpe:/o:microsoft:windows_8.1" },
                                { "vulnerable": true, "cpe22Uri": "cpe:/o:microsoft:windows_vista::sp2" }
                            ]
                        }
                    ]
                }
            },
            {
                "cve": { "CVE_data_meta": { "ID": "CVE-2666-1337" } },
                "configurations": {
                    "nodes": [
                        {
                            "operator": "AND",
                            "children": [
                                {
                                    "operator": "OR",
                                    "cpe_match": [ { "vulnerable": true, "cpe22Uri": "cpe:/o:microsoft:windows_10" } ]
                                },
                                {
                                    "operator": "OR",
                                    "cpe_match": [ { "vulnerable": true, "cpe22Uri": "cpe:/a:adobe:flash_player:24.0.0.194" } ]
                                }
                            ]
                        }
                    ]
                }
            },
            {
                "cve": { "CVE_data_meta": { "ID": "CVE-2666-6969" } },
                "configurations": {
                    "nodes": [
                        {
                            "operator": "AND",
                            "children": [
                                {
                                    "operator": "OR",
                                    "cpe_match": [ { "vulnerable": true, "cpe22Uri": "cpe:/o:microsoft:windows_10" } ]
                                },
                                {
                                    "operator": "OR",
                                    "cpe_match": [ { "vulnerable": true, "cpe22Uri": "cpe:/a:adobe:flash_player:24.0.1" } ]
                                }
                            ]
                        }
                    ]
                }
            }
        ]
    }"#;

    fn cache_for(feed: &str) -> Arc<MatchCache> {
        let dict = Arc::new(Dictionary::from_json_str(feed).expect("test feed parses"));
        Arc::new(MatchCache::new(dict))
    }

    async fn run_to_lines(
        processor: &Processor,
        input: &str,
    ) -> (Vec<String>, ProcessStats) {
        let (output, stats) = processor
            .run(input.as_bytes(), Vec::new())
            .await
            .expect("pipeline runs");
        let text = String::from_utf8(output).expect("utf8 output");
        let lines = text.lines().map(str::to_owned).collect();
        (lines, stats)
    }

    #[tokio::test]
    async fn two_vuln_match_expansion() {
        let config = ProcessorConfig {
            workers: 2,
            cpes_at: 4,
            cves_at: 6,
            matches_at: 7,
            drop: DropColumns::parse("1,3").expect("drop set parses"),
            in_field_sep: ',',
            in_list_sep: '+',
            out_field_sep: '|',
            out_list_sep: '&',
            ..ProcessorConfig::default()
        };
        let processor = Processor::new(cache_for(TWO_VULN_FEED), config);

        let input =
            "1,2,3,cpe:/o:microsoft:windows_10:-::~~~~x64~+cpe:/a:adobe:flash_player:24.0.0.194,5,6,7,8,9,10\n";
        let (mut lines, stats) = run_to_lines(&processor, input).await;
        lines.sort();

        assert_eq!(stats.records_in, 1);
        assert_eq!(stats.records_out, 2);
        assert_eq!(
            lines,
            vec![
                "2|cpe:/o:microsoft:windows_10:-::~~~~x64~&cpe:/a:adobe:flash_player:24.0.0.194|5|6|7|CVE-2016-0165|cpe:/o:microsoft:windows_10:-::~~~~x64~|8|9|10",
                "2|cpe:/o:microsoft:windows_10:-::~~~~x64~&cpe:/a:adobe:flash_player:24.0.0.194|5|6|7|CVE-2666-1337|cpe:/a:adobe:flash_player:24.0.0.194&cpe:/o:microsoft:windows_10:-::~~~~x64~|8|9|10",
            ]
        );
    }

    #[tokio::test]
    async fn empty_input_produces_no_output() {
        let processor = Processor::new(cache_for(TWO_VULN_FEED), base_config());
        let (lines, stats) = run_to_lines(&processor, "").await;
        assert!(lines.is_empty());
        assert_eq!(stats.records_out, 0);
    }

    #[tokio::test]
    async fn short_records_are_skipped() {
        let mut config = base_config();
        config.cpes_at = 4;
        let processor = Processor::new(cache_for(TWO_VULN_FEED), config);
        let (lines, stats) = run_to_lines(&processor, "only\ttwo\n").await;
        assert!(lines.is_empty());
        assert_eq!(stats.records_in, 0);
    }

    #[tokio::test]
    async fn unparseable_uris_become_placeholders() {
        let config = ProcessorConfig {
            cpes_at: 1,
            cves_at: 2,
            matches_at: 0,
            ..base_config()
        };
        let processor = Processor::new(cache_for(TWO_VULN_FEED), config);
        // 선행 빈 토큰은 nil 플레이스홀더로 허용됨
        let (lines, _) = run_to_lines(&processor, ",,cpe:/o:microsoft:windows_10:-\n").await;
        assert_eq!(lines.len(), 1);
        assert!(lines[0].contains("CVE-2016-0165"));
    }

    #[tokio::test]
    async fn no_false_positive_for_unknown_product() {
        let config = ProcessorConfig {
            cpes_at: 1,
            cves_at: 3,
            matches_at: 2,
            in_list_sep: ';',
            out_list_sep: ';',
            ..base_config()
        };
        let processor = Processor::new(cache_for(TWO_VULN_FEED), config);
        let (lines, _) = run_to_lines(&processor, "cpe:/a::glibc:2.27-1\n").await;
        assert!(lines.is_empty());
    }

    #[tokio::test]
    async fn metadata_columns_rendered() {
        let feed = r#"{
            "CVE_Items": [
                {
                    "cve": {
                        "CVE_data_meta": { "ID": "CVE-2024-0001" },
                        "problemtype": {
                            "problemtype_data": [
                                { "description": [
                                    { "lang": "en", "value": "CWE-79" },
                                    { "lang": "en", "value": "CWE-89" }
                                ] }
                            ]
                        }
                    },
                    "configurations": {
                        "nodes": [
                            { "operator": "OR", "cpe_match": [ { "cpe22Uri": "cpe:/a:foo:bar" } ] }
                        ]
                    },
                    "impact": {
                        "baseMetricV2": { "cvssV2": { "baseScore": 5.0, "vectorString": "v2" } },
                        "baseMetricV3": { "cvssV3": { "baseScore": 9.8, "vectorString": "v3" } }
                    }
                }
            ]
        }"#;
        let config = ProcessorConfig {
            cpes_at: 1,
            cves_at: 2,
            cwes_at: Some(3),
            cvss_at: Some(4),
            cvss2_at: Some(5),
            cvss3_at: Some(6),
            provider: Some(("nvd".to_owned(), 7)),
            ..base_config()
        };
        let processor = Processor::new(cache_for(feed), config);
        let (lines, _) = run_to_lines(&processor, "cpe:/a:foo:bar\n").await;
        assert_eq!(
            lines,
            vec!["cpe:/a:foo:bar\tCVE-2024-0001\tCWE-79,CWE-89\t9.8\t5.0\t9.8\tnvd"]
        );
    }

    #[tokio::test]
    async fn indexed_cache_produces_same_rows() {
        use cvegate_cvefeed::ProductIndex;

        let dict = Arc::new(Dictionary::from_json_str(TWO_VULN_FEED).expect("test feed parses"));
        let indexed = Arc::new(
            MatchCache::new(Arc::clone(&dict)).with_index(ProductIndex::build(&dict)),
        );
        let plain = Arc::new(MatchCache::new(dict));

        let config = ProcessorConfig {
            cpes_at: 1,
            cves_at: 2,
            in_list_sep: '+',
            out_list_sep: '&',
            ..base_config()
        };
        let input = "cpe:/o:microsoft:windows_10:-+cpe:/a:adobe:flash_player:24.0.0.194\n";

        let (mut plain_lines, _) =
            run_to_lines(&Processor::new(plain, config.clone()), input).await;
        let (mut indexed_lines, _) =
            run_to_lines(&Processor::new(indexed, config), input).await;
        plain_lines.sort();
        indexed_lines.sort();
        assert_eq!(plain_lines, indexed_lines);
        assert_eq!(plain_lines.len(), 2);
    }

    #[tokio::test]
    async fn multiple_records_fan_out_concurrently() {
        let config = ProcessorConfig {
            workers: 4,
            cpes_at: 1,
            cves_at: 2,
            ..base_config()
        };
        let processor = Processor::new(cache_for(TWO_VULN_FEED), config);
        let input = "cpe:/o:microsoft:windows_10:-\n".repeat(64);
        let (lines, stats) = run_to_lines(&processor, &input).await;
        assert_eq!(stats.records_in, 64);
        assert_eq!(lines.len(), 64);
        // 같은 인벤토리 64건은 single-flight 캐시로 한 번만 계산됨
        assert_eq!(processor.cache.computation_count(), 1);
    }
}
