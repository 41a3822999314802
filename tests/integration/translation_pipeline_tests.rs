/*!
 * End-to-end tests: read an SRT file, translate it, write it back
 */

use anyhow::Result;
use std::fs;
use std::path::Path;
use std::process::Command;
use std::sync::Arc;

use subtrans::app_config::{BackendConfig, BackendKind, Config};
use subtrans::providers::mock::MockBackend;
use subtrans::{BatchTranslator, LineEnding, SubtitleCodec};
use crate::common::{self, RecordingObserver};

fn write_ollama_config(dir: &Path, endpoint: &str) -> Result<std::path::PathBuf> {
    let mut config = Config::default();
    config.target_language = "nl".to_string();
    config.translation.backend = BackendConfig::Ollama {
        model: "llama3.2".to_string(),
        endpoint: endpoint.to_string(),
        timeout_secs: 5,
        temperature: 0.3,
    };
    config.translation.retry.max_retries = Some(0);
    config.subtitle.line_ending = LineEnding::Lf;

    let path = dir.join("conf.json");
    config.save(&path)?;
    Ok(path)
}

/// File in, translated file out, timings untouched
#[tokio::test]
async fn test_pipeline_withMockBackend_shouldWriteTranslatedFile() -> Result<()> {
    let dir = common::create_temp_dir()?;
    let input = common::create_test_subtitle(dir.path(), "movie.srt")?;

    let captions = SubtitleCodec::parse(&fs::read_to_string(&input)?);
    let translator = BatchTranslator::new(Arc::new(MockBackend::working()), common::test_options(2, 2));
    let observer = RecordingObserver::default();
    let translated = translator.translate(&captions, &observer).await?;

    let output = dir.path().join("movie.fr.srt");
    fs::write(&output, SubtitleCodec::new(LineEnding::Lf).stringify(&translated))?;
    let written = fs::read_to_string(&output)?;

    assert!(written.starts_with("1\n00:00:01,000 --> 00:00:04,000\n[fr] This is a test subtitle.\n\n2\n"));
    let reparsed = SubtitleCodec::parse(&written);
    assert_eq!(reparsed.len(), 3);
    for (original, result) in captions.iter().zip(&reparsed) {
        assert_eq!(original.id(), result.id());
        assert_eq!(original.start_seconds(), result.start_seconds());
        assert_eq!(original.end_seconds(), result.end_seconds());
    }
    assert!(observer.error_ids().is_empty());
    Ok(())
}

/// Period-separated input comes out in canonical form
#[tokio::test]
async fn test_pipeline_withPeriodTimestamps_shouldWriteCanonicalTimestamps() -> Result<()> {
    let raw = "1\r\n0:0:1.5 --> 0:0:2.25\r\nHello\r\n\r\n2\r\n00:00:03.000 --> 00:00:04.000\r\nWorld\r\n";
    let captions = SubtitleCodec::parse(raw);
    let translator = BatchTranslator::new(Arc::new(MockBackend::working()), common::test_options(10, 1));

    let translated = translator.translate(&captions, &subtrans::translation::NoopObserver).await?;
    let written = SubtitleCodec::new(LineEnding::CrLf).stringify(&translated);

    assert_eq!(
        written,
        "1\r\n00:00:01,500 --> 00:00:02,250\r\n[fr] Hello\r\n\r\n2\r\n00:00:03,000 --> 00:00:04,000\r\n[fr] World\r\n\r\n"
    );
    Ok(())
}

/// The binary translates through a configured backend
#[tokio::test]
async fn test_cli_withOllamaConfig_shouldWriteDefaultOutput() -> Result<()> {
    let dir = common::create_temp_dir()?;
    let input = common::create_test_subtitle(dir.path(), "movie.srt")?;
    let answer = serde_json::json!({
        "model": "llama3.2",
        "message": { "role": "assistant", "content": r#"{"1": "Een", "2": "Twee", "3": "Drie"}"# },
        "done": true
    });
    let (url, request) = common::serve_once("200 OK", answer.to_string()).await?;
    let config = write_ollama_config(dir.path(), &url)?;

    let status = tokio::task::spawn_blocking(move || {
        Command::new(env!("CARGO_BIN_EXE_subtrans"))
            .arg("-c")
            .arg(&config)
            .arg(&input)
            .status()
    })
    .await??;
    assert!(status.success());
    assert!(request.await?.contains("This is a test subtitle."));

    let written = fs::read_to_string(dir.path().join("movie.nl.srt"))?;
    let texts: Vec<String> = SubtitleCodec::parse(&written).iter().map(|c| c.text().to_string()).collect();
    assert_eq!(texts, vec!["Een", "Twee", "Drie"]);
    Ok(())
}

/// A file without cues is an error
#[test]
fn test_cli_withEmptyInput_shouldFailWithNoCaptions() -> Result<()> {
    let dir = common::create_temp_dir()?;
    let input = common::create_test_file(dir.path(), "empty.srt", "nothing to see here\n")?;
    let config = write_ollama_config(dir.path(), "http://127.0.0.1:9")?;

    let output = Command::new(env!("CARGO_BIN_EXE_subtrans"))
        .arg("-c")
        .arg(&config)
        .arg(&input)
        .output()?;

    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("No captions found"));
    assert!(!dir.path().join("empty.nl.srt").exists());
    Ok(())
}

/// An existing output file is left alone without -f
#[test]
fn test_cli_withExistingOutput_shouldNotOverwrite() -> Result<()> {
    let dir = common::create_temp_dir()?;
    let input = common::create_test_subtitle(dir.path(), "movie.srt")?;
    let existing = common::create_test_file(dir.path(), "movie.nl.srt", "keep me")?;
    let config = write_ollama_config(dir.path(), "http://127.0.0.1:9")?;

    let status = Command::new(env!("CARGO_BIN_EXE_subtrans"))
        .arg("-c")
        .arg(&config)
        .arg(&input)
        .status()?;

    assert!(status.success());
    assert_eq!(fs::read_to_string(existing)?, "keep me");
    Ok(())
}

/// Missing configuration files are created with defaults
#[test]
fn test_cli_withMissingConfig_shouldCreateDefault() -> Result<()> {
    let dir = common::create_temp_dir()?;
    let input = common::create_test_file(dir.path(), "empty.srt", "")?;
    let config = dir.path().join("new.json");

    let output = Command::new(env!("CARGO_BIN_EXE_subtrans"))
        .env_remove("OPENAI_API_KEY")
        .arg("-c")
        .arg(&config)
        .arg("-p")
        .arg("ollama")
        .arg(&input)
        .output()?;

    assert!(!output.status.success());
    let saved = Config::from_file(&config)?;
    assert_eq!(saved, Config::default());
    Ok(())
}

/// Shell completions are generated
#[test]
fn test_cli_completions_shouldPrintScript() -> Result<()> {
    let output = Command::new(env!("CARGO_BIN_EXE_subtrans"))
        .args(["completions", "bash"])
        .output()?;

    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains("subtrans"));
    Ok(())
}
