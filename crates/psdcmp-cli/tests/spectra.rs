use assert_cmd::cargo::cargo_bin_cmd;
use rand::{rngs::StdRng, Rng, SeedableRng};
use serde_json::Value;
use std::{error::Error, f64::consts::PI, fs, path::Path};
use tempfile::tempdir;

/// OpenBCI-style capture with a `%` comment header and a 10 Hz rhythm in
/// the first half on channels 2..=5.
fn write_capture(path: &Path, n: usize) -> Result<(), Box<dyn Error>> {
    let mut rng = StdRng::seed_from_u64(11);
    let mut text = String::from("%OpenBCI Raw EEG Data\n%Sample Rate = 250 Hz\n");
    for i in 0..n {
        let t = i as f64 / 250.0;
        let rhythm = if i < n / 2 {
            8.0 * (2.0 * PI * 10.0 * t).sin()
        } else {
            0.0
        };
        let channels: Vec<String> = (0..4)
            .map(|_| format!("{:.6}", rhythm + rng.gen_range(-1.0..1.0)))
            .collect();
        text.push_str(&format!("{i}\t0.0\t{}\n", channels.join("\t")));
    }
    fs::write(path, text)?;
    Ok(())
}

#[test]
fn psd_writes_band_limited_curves() -> Result<(), Box<dyn Error>> {
    let dir = tempdir()?;
    let input = dir.path().join("capture.txt");
    let out = dir.path().join("psd.csv");
    write_capture(&input, 5000)?;

    let mut cmd = cargo_bin_cmd!("psdcmp");
    cmd.args(["psd", "--filter", "high", "--input"])
        .arg(&input)
        .arg("--out")
        .arg(&out);
    cmd.assert().success();

    let mut reader = csv::Reader::from_path(&out)?;
    let headers: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
    assert_eq!(headers, vec!["Frequency (Hz)", "Closed (dB)", "Open (dB)"]);
    let rows: Vec<Vec<f64>> = reader
        .records()
        .map(|r| -> Result<Vec<f64>, Box<dyn Error>> {
            r?.iter()
                .map(|c| c.parse::<f64>().map_err(Into::into))
                .collect()
        })
        .collect::<Result<_, _>>()?;
    assert_eq!(rows.len(), 61);
    assert_eq!(rows[60][0], 30.0);
    let ten_hz = &rows[20];
    assert_eq!(ten_hz[0], 10.0);
    assert!(ten_hz[1] > ten_hz[2] + 10.0, "{ten_hz:?}");
    Ok(())
}

#[test]
fn psd_rejects_invalid_cutoff() -> Result<(), Box<dyn Error>> {
    let dir = tempdir()?;
    let input = dir.path().join("capture.txt");
    write_capture(&input, 1000)?;

    let mut cmd = cargo_bin_cmd!("psdcmp");
    cmd.args(["psd", "--filter", "low", "--cutoff", "400", "--input"])
        .arg(&input)
        .arg("--out")
        .arg(dir.path().join("psd.csv"));
    cmd.assert().failure();
    Ok(())
}

#[test]
fn periodogram_prints_points_above_skipped_bins() -> Result<(), Box<dyn Error>> {
    let dir = tempdir()?;
    let input = dir.path().join("capture.txt");
    write_capture(&input, 1000)?;

    let mut cmd = cargo_bin_cmd!("psdcmp");
    cmd.args(["periodogram", "--skip-bins", "40", "--input"])
        .arg(&input);
    let output = cmd.assert().success().get_output().stdout.clone();
    let json: Value = serde_json::from_slice(&output)?;

    assert_eq!(json["fs"], 250.0);
    assert_eq!(json["skip_bins"], 40);
    let points = json["points"].as_array().ok_or("points")?;
    // 1000 samples: 501 one-sided bins at 0.25 Hz spacing
    assert_eq!(points.len(), 461);
    assert_eq!(points[0][0], 10.0);
    assert!(points.iter().all(|p| p[1].as_f64().is_some()));
    Ok(())
}

#[test]
fn config_prints_default_toml() -> Result<(), Box<dyn Error>> {
    let mut cmd = cargo_bin_cmd!("psdcmp");
    cmd.arg("config");
    let output = cmd.assert().success().get_output().stdout.clone();
    let text = String::from_utf8(output)?;
    assert!(text.contains("sampling_rate_hz = 250.0"), "{text}");
    assert!(text.contains("channels = ["), "{text}");
    assert!(text.contains("Low-Pass Filter"), "{text}");
    assert!(text.contains("[[filters]]"), "{text}");
    Ok(())
}

#[test]
fn default_config_round_trips_through_file() -> Result<(), Box<dyn Error>> {
    let dir = tempdir()?;
    let config = dir.path().join("analysis.toml");
    let input = dir.path().join("capture.txt");
    write_capture(&input, 2000)?;

    let mut cmd = cargo_bin_cmd!("psdcmp");
    cmd.arg("config");
    let output = cmd.assert().success().get_output().stdout.clone();
    fs::write(&config, output)?;

    let mut cmd = cargo_bin_cmd!("psdcmp");
    cmd.args(["psd", "--config"])
        .arg(&config)
        .arg("--input")
        .arg(&input)
        .arg("--out")
        .arg(dir.path().join("psd.csv"));
    cmd.assert().success();
    Ok(())
}
