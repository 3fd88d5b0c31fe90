//! # Integration Tests
//!
//! 集成测试与端到端测试。
//!
//! 负责：
//! - 配置契约测试
//! - 准入 -> 派发 -> 落盘 e2e 测试（临时目录作为保存根）

#[cfg(test)]
mod contract_tests {
    use config_loader::{ConfigFormat, ConfigLoader};
    use contracts::{ServiceConfig, SuccessPolicy};

    #[test]
    fn test_default_config_is_valid() {
        let config = ServiceConfig::default();
        ConfigLoader::validate(&config).unwrap();
        assert_eq!(config.store.concurrency, 4);
        assert_eq!(config.store.success_policy, SuccessPolicy::BestEffort);
    }

    #[test]
    fn test_config_survives_toml_and_json() {
        let mut config = ServiceConfig::default();
        config.store.concurrency = 9;
        config.store.success_policy = SuccessPolicy::RequireAny;

        let toml = ConfigLoader::to_toml(&config).unwrap();
        assert_eq!(
            ConfigLoader::load_from_str(&toml, ConfigFormat::Toml).unwrap(),
            config
        );

        let json = ConfigLoader::to_json(&config).unwrap();
        assert_eq!(
            ConfigLoader::load_from_str(&json, ConfigFormat::Json).unwrap(),
            config
        );
    }
}

#[cfg(test)]
mod e2e_tests {
    use std::path::{Path, PathBuf};
    use std::time::Instant;

    use chrono::NaiveDate;
    use contracts::{IntakeConfig, JobError, StoreConfig, SuccessPolicy};
    use dispatcher::create_dispatcher;
    use dispatcher::writer::TEMP_PREFIX;
    use ingestion::{Intake, IngestionError, UploadRequest};
    use observability::JobMetricsAggregator;

    fn request(url: &str, name: &str, folder_id: &str) -> UploadRequest {
        UploadRequest {
            url: Some(url.to_string()),
            name: Some(name.to_string()),
            folder_id: Some(folder_id.to_string()),
        }
    }

    fn store(roots: Vec<PathBuf>, concurrency: usize) -> StoreConfig {
        StoreConfig {
            concurrency,
            save_roots: roots,
            success_policy: SuccessPolicy::BestEffort,
        }
    }

    fn new_year() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()
    }

    /// Recursively collect file names under `dir`
    fn files_under(dir: &Path) -> Vec<String> {
        let mut out = Vec::new();
        let Ok(entries) = std::fs::read_dir(dir) else {
            return out;
        };
        for entry in entries.flatten() {
            let path = entry.path();
            if path.is_dir() {
                out.extend(files_under(&path));
            } else {
                out.push(entry.file_name().to_string_lossy().into_owned());
            }
        }
        out
    }

    /// End-to-end test: Intake -> Dispatcher -> every save root
    ///
    /// 验证完整的数据流：
    /// 1. Intake 校验并清洗请求
    /// 2. Dispatcher 排队并派发到执行单元
    /// 3. 执行单元解码后原子写入每个保存根
    #[tokio::test]
    async fn test_e2e_replicates_to_every_root() {
        let tmp = tempfile::tempdir().unwrap();
        let roots = vec![tmp.path().join("primary"), tmp.path().join("mirror")];

        let intake = Intake::new(IntakeConfig::default());
        let dispatcher = create_dispatcher(&store(roots.clone(), 2)).unwrap();

        let job = intake
            .admit_on(&request("data:image/png;base64,AQID", "img", "f1"), new_year())
            .unwrap();
        let report = dispatcher.submit(job).await.unwrap();

        assert_eq!(report.bytes, 3);
        assert_eq!(report.written_roots(), 2);
        for root in &roots {
            let target = root.join("f1").join("2024-01-01").join("img.png");
            assert_eq!(std::fs::read(&target).unwrap(), vec![1, 2, 3]);
        }

        let snap = dispatcher.shutdown().await;
        assert_eq!(snap.succeeded, 1);
    }

    #[tokio::test]
    async fn test_e2e_sanitized_identifiers_and_jpeg_extension() {
        let tmp = tempfile::tempdir().unwrap();
        let intake = Intake::new(IntakeConfig::default());
        let dispatcher = create_dispatcher(&store(vec![tmp.path().to_path_buf()], 1)).unwrap();

        let job = intake
            .admit_on(
                &request("data:image/jpeg;base64,/9j/", "../../etc/passwd", "a/b"),
                new_year(),
            )
            .unwrap();
        let report = dispatcher.submit(job).await.unwrap();
        dispatcher.shutdown().await;

        assert_eq!(report.folder_id, "ab");
        assert_eq!(report.name, "....etcpasswd.jpg");
        let target = &report.writes[0].target;
        assert!(target.starts_with(tmp.path()));
        assert_eq!(target.extension().unwrap(), "jpg");
        assert!(target.exists());
        assert_eq!(std::fs::read(target).unwrap(), vec![0xff, 0xd8, 0xff]);
    }

    #[test]
    fn test_e2e_rejected_request_never_reaches_dispatcher() {
        let intake = Intake::new(IntakeConfig::default());

        let err = intake
            .admit_on(&request("http://example.com/a.png", "a", "f"), new_year())
            .unwrap_err();
        assert!(matches!(err, IngestionError::InvalidDataUrl { .. }));

        let err = intake
            .admit(&UploadRequest {
                url: Some("data:image/png;base64,AQID".into()),
                name: None,
                folder_id: Some("f".into()),
            })
            .unwrap_err();
        assert_eq!(err, IngestionError::MissingField { field: "name" });
    }

    #[tokio::test]
    async fn test_e2e_best_effort_with_broken_root() {
        let tmp = tempfile::tempdir().unwrap();
        // A regular file where a directory is expected: every write under it fails.
        let blocked = tmp.path().join("blocked");
        std::fs::write(&blocked, b"not a dir").unwrap();
        let good = tmp.path().join("good");

        let intake = Intake::new(IntakeConfig::default());
        let dispatcher = create_dispatcher(&store(vec![blocked.clone(), good.clone()], 2)).unwrap();

        let job = intake
            .admit_on(&request("data:image/png;base64,AQID", "img", "f1"), new_year())
            .unwrap();
        let report = dispatcher.submit(job).await.unwrap();
        dispatcher.shutdown().await;

        assert_eq!(report.written_roots(), 1);
        assert_eq!(report.failed_roots(), 1);
        assert!(report.writes[0].error.is_some());
        assert!(report.writes[1].is_ok());
        assert!(good.join("f1/2024-01-01/img.png").exists());
    }

    #[tokio::test]
    async fn test_e2e_require_any_fails_when_nothing_written() {
        let tmp = tempfile::tempdir().unwrap();
        let blocked = tmp.path().join("blocked");
        std::fs::write(&blocked, b"not a dir").unwrap();

        let config = StoreConfig {
            success_policy: SuccessPolicy::RequireAny,
            ..store(vec![blocked], 1)
        };
        let intake = Intake::new(IntakeConfig::default());
        let dispatcher = create_dispatcher(&config).unwrap();

        let job = intake
            .admit_on(&request("data:image/png;base64,AQID", "img", "f1"), new_year())
            .unwrap();
        let err = dispatcher.submit(job).await.unwrap_err();
        assert_eq!(err.kind(), "no_root_written");

        let snap = dispatcher.shutdown().await;
        assert_eq!(snap.failed, 1);
    }

    #[tokio::test]
    async fn test_e2e_many_jobs_bounded_and_clean() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path().join("store");
        let intake = Intake::new(IntakeConfig::default());
        let dispatcher = create_dispatcher(&store(vec![root.clone()], 3)).unwrap();

        let handles: Vec<_> = (0..24)
            .map(|i| {
                let job = intake
                    .admit_on(
                        &request("data:image/png;base64,AAECAwQFBgcICQ==", &format!("img{i}"), "batch"),
                        new_year(),
                    )
                    .unwrap();
                dispatcher.submit(job)
            })
            .collect();

        let mut aggregator = JobMetricsAggregator::new();
        for handle in handles {
            let started = Instant::now();
            let result = handle.await;
            aggregator.update(&result, started.elapsed());
            assert_eq!(result.unwrap().bytes, 10);
        }

        let summary = aggregator.summary();
        assert_eq!(summary.total_jobs, 24);
        assert_eq!(summary.failed, 0);
        assert_eq!(summary.bytes_decoded, 240);

        let snap = dispatcher.shutdown().await;
        assert_eq!(snap.submitted, 24);
        assert_eq!(snap.succeeded, 24);
        assert!(snap.peak_active <= 3, "peak {} exceeds limit", snap.peak_active);

        let files = files_under(&root);
        assert_eq!(files.len(), 24);
        assert!(files.iter().all(|f| !f.starts_with(TEMP_PREFIX)));
    }

    #[tokio::test]
    async fn test_e2e_decode_failure_isolated() {
        let tmp = tempfile::tempdir().unwrap();
        let intake = Intake::new(IntakeConfig::default());
        let dispatcher = create_dispatcher(&store(vec![tmp.path().to_path_buf()], 1)).unwrap();

        let bad = intake
            .admit_on(&request("data:image/png;base64,@@@@", "bad", "f"), new_year())
            .unwrap();
        let good = intake
            .admit_on(&request("data:image/png;base64,AQID", "good", "f"), new_year())
            .unwrap();

        let bad = dispatcher.submit(bad);
        let good = dispatcher.submit(good);

        assert!(matches!(bad.await, Err(JobError::Decode { .. })));
        assert!(good.await.is_ok());
        dispatcher.shutdown().await;

        assert_eq!(files_under(tmp.path()), vec!["good.png".to_string()]);
    }

    #[test]
    fn test_e2e_dot_only_folder_rejected() {
        let intake = Intake::new(IntakeConfig::default());
        let err = intake
            .admit_on(&request("data:image/png;base64,AQID", "img", ".."), new_year())
            .unwrap_err();
        assert_eq!(err, IngestionError::InvalidIdentifier { field: "folderId" });
    }

    #[tokio::test]
    async fn test_e2e_config_file_drives_dispatcher() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path().join("from-config");
        let config_path = tmp.path().join("imgstore.toml");
        std::fs::write(
            &config_path,
            format!(
                "[store]\nconcurrency = 2\nsave_roots = [{:?}]\n\n[intake]\ndefault_extension = \".img\"\n",
                root.display().to_string()
            ),
        )
        .unwrap();

        let config = config_loader::ConfigLoader::load_from_path(&config_path).unwrap();
        let intake = Intake::new(config.intake.clone());
        let dispatcher = create_dispatcher(&config.store).unwrap();
        assert_eq!(dispatcher.concurrency(), 2);

        let job = intake
            .admit_on(&request("data:image/x-raw;base64,AQID", "raw", "f"), new_year())
            .unwrap();
        dispatcher.submit(job).await.unwrap();
        dispatcher.shutdown().await;

        assert_eq!(
            std::fs::read(root.join("f/2024-01-01/raw.img")).unwrap(),
            vec![1, 2, 3]
        );
    }
}
