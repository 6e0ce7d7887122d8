use serde::{Deserialize, Serialize};
use statrs::distribution::{ContinuousCDF, FisherSnedecor, StudentsT};

use crate::spectrum::ConditionPsd;

/// Test statistic with its p-value. Either may be NaN for degenerate input.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TestResult {
    pub statistic: f64,
    pub pvalue: f64,
}

impl TestResult {
    const UNDEFINED: TestResult = TestResult {
        statistic: f64::NAN,
        pvalue: f64::NAN,
    };
}

fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

fn sum_sq_dev(values: &[f64], center: f64) -> f64 {
    values.iter().map(|v| (v - center).powi(2)).sum()
}

/// One-way ANOVA across `groups`.
///
/// Groups with no within-group spread give F = inf (p = 0) when their means
/// differ, and NaN when every value is the same.
pub fn one_way_anova(groups: &[&[f64]]) -> TestResult {
    let k = groups.len();
    let total: usize = groups.iter().map(|g| g.len()).sum();
    if k < 2 || groups.iter().any(|g| g.is_empty()) || total <= k {
        return TestResult::UNDEFINED;
    }
    let grand = groups.iter().flat_map(|g| g.iter()).sum::<f64>() / total as f64;
    let mut ss_between = 0.0;
    let mut ss_within = 0.0;
    for group in groups {
        let m = mean(group);
        ss_between += group.len() as f64 * (m - grand).powi(2);
        ss_within += sum_sq_dev(group, m);
    }
    let df_between = (k - 1) as f64;
    let df_within = (total - k) as f64;
    if ss_within == 0.0 {
        return if ss_between == 0.0 {
            TestResult::UNDEFINED
        } else {
            TestResult {
                statistic: f64::INFINITY,
                pvalue: 0.0,
            }
        };
    }
    let statistic = (ss_between / df_between) / (ss_within / df_within);
    let pvalue = if statistic.is_nan() {
        f64::NAN
    } else {
        FisherSnedecor::new(df_between, df_within)
            .map(|dist| dist.sf(statistic))
            .unwrap_or(f64::NAN)
    };
    TestResult { statistic, pvalue }
}

/// Independent two-sample Student t-test with pooled variance, two-sided.
pub fn t_test_ind(a: &[f64], b: &[f64]) -> TestResult {
    let (na, nb) = (a.len() as f64, b.len() as f64);
    if a.len() < 2 || b.len() < 2 {
        return TestResult::UNDEFINED;
    }
    let (ma, mb) = (mean(a), mean(b));
    let df = na + nb - 2.0;
    let pooled = (sum_sq_dev(a, ma) + sum_sq_dev(b, mb)) / df;
    let statistic = (ma - mb) / (pooled * (1.0 / na + 1.0 / nb)).sqrt();
    let pvalue = if statistic.is_nan() {
        f64::NAN
    } else if statistic.is_infinite() {
        0.0
    } else {
        StudentsT::new(0.0, 1.0, df)
            .map(|dist| 2.0 * dist.sf(statistic.abs()))
            .unwrap_or(f64::NAN)
    };
    TestResult { statistic, pvalue }
}

/// Standardize to zero mean and unit population standard deviation.
///
/// A constant vector has no spread and maps to all-NaN.
pub fn z_score(values: &[f64]) -> Vec<f64> {
    if values.is_empty() {
        return Vec::new();
    }
    let m = mean(values);
    let sd = (sum_sq_dev(values, m) / values.len() as f64).sqrt();
    if sd == 0.0 {
        return vec![f64::NAN; values.len()];
    }
    values.iter().map(|v| (v - m) / sd).collect()
}

/// Per-bin `|a - b|` and the name of the strictly larger side
/// (ties and NaN go to `name_b`).
pub fn absolute_deltas(a: &[f64], b: &[f64], name_a: &str, name_b: &str) -> (Vec<f64>, Vec<String>) {
    a.iter()
        .zip(b)
        .map(|(x, y)| {
            let higher = if x > y { name_a } else { name_b };
            ((x - y).abs(), higher.to_string())
        })
        .unzip()
}

/// One frequency bin of a subject comparison.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonRow {
    pub filter: String,
    pub frequency_hz: f64,
    pub z_a_closed: f64,
    pub z_a_open: f64,
    pub z_b_closed: f64,
    pub z_b_open: f64,
    pub delta_closed: f64,
    pub delta_open: f64,
    pub p_closed: f64,
    pub p_open: f64,
    pub higher_closed: String,
    pub higher_open: String,
}

/// Group-level tests for one filter configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockSummary {
    pub filter: String,
    pub bins: usize,
    pub anova_closed: TestResult,
    pub anova_open: TestResult,
    pub ttest_closed: TestResult,
    pub ttest_open: TestResult,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonBlock {
    pub summary: BlockSummary,
    pub rows: Vec<ComparisonRow>,
}

/// Compare two subjects' band-limited spectra for one filter configuration.
///
/// Both subjects must share a frequency axis. The t-test compares the whole
/// band, so its p-value is repeated on every row of the block.
pub fn compare_subjects(
    filter: &str,
    a: &ConditionPsd,
    b: &ConditionPsd,
    name_a: &str,
    name_b: &str,
) -> ComparisonBlock {
    let (a_closed, a_open) = (&a.closed.power_db, &a.open.power_db);
    let (b_closed, b_open) = (&b.closed.power_db, &b.open.power_db);

    let anova_closed = one_way_anova(&[a_closed.as_slice(), b_closed.as_slice()]);
    let anova_open = one_way_anova(&[a_open.as_slice(), b_open.as_slice()]);
    let ttest_closed = t_test_ind(a_closed, b_closed);
    let ttest_open = t_test_ind(a_open, b_open);

    let za_closed = z_score(a_closed);
    let za_open = z_score(a_open);
    let zb_closed = z_score(b_closed);
    let zb_open = z_score(b_open);

    let (delta_closed, higher_closed) = absolute_deltas(a_closed, b_closed, name_a, name_b);
    let (delta_open, higher_open) = absolute_deltas(a_open, b_open, name_a, name_b);

    let bins = [
        a.closed.len(),
        a.open.len(),
        b.closed.len(),
        b.open.len(),
    ]
    .into_iter()
    .min()
    .unwrap_or(0);

    let rows = (0..bins)
        .map(|i| ComparisonRow {
            filter: filter.to_string(),
            frequency_hz: a.closed.freqs[i],
            z_a_closed: za_closed[i],
            z_a_open: za_open[i],
            z_b_closed: zb_closed[i],
            z_b_open: zb_open[i],
            delta_closed: delta_closed[i],
            delta_open: delta_open[i],
            p_closed: ttest_closed.pvalue,
            p_open: ttest_open.pvalue,
            higher_closed: higher_closed[i].clone(),
            higher_open: higher_open[i].clone(),
        })
        .collect();

    ComparisonBlock {
        summary: BlockSummary {
            filter: filter.to_string(),
            bins,
            anova_closed,
            anova_open,
            ttest_closed,
            ttest_open,
        },
        rows,
    }
}
