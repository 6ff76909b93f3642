// src/services/report.rs
use std::fmt::Write;

use crate::services::regression::RegressionResult;

const WIDTH: usize = 78;

/// Condition numbers above this get a multicollinearity note.
const LARGE_CONDITION: f64 = 1000.0;

/// Plain-text OLS summary in the layout analysts expect from statsmodels.
pub fn format_summary(fit: &RegressionResult) -> String {
    let mut out = String::new();
    let heavy = "=".repeat(WIDTH);
    let light = "-".repeat(WIDTH);

    let _ = writeln!(out, "{:^width$}", "OLS Regression Results", width = WIDTH);
    let _ = writeln!(out, "{}", heavy);

    let header = [
        ("Dep. Variable:", fit.dep_name.clone(), "R-squared:", fmt3(fit.r_squared)),
        ("Model:", "OLS".to_string(), "Adj. R-squared:", fmt3(fit.adj_r_squared)),
        ("Method:", "Least Squares".to_string(), "F-statistic:", fmt_g(fit.f_statistic)),
        ("No. Observations:", fit.nobs.to_string(), "Prob (F-statistic):", fmt_g(fit.f_p_value)),
        ("Df Residuals:", fit.df_resid.to_string(), "Log-Likelihood:", fmt_g(fit.log_likelihood)),
        ("Df Model:", fit.df_model.to_string(), "AIC:", fmt_g(fit.aic)),
        ("Covariance Type:", "nonrobust".to_string(), "BIC:", fmt_g(fit.bic)),
    ];
    for (left_label, left_value, right_label, right_value) in header.iter() {
        let _ = writeln!(
            out,
            "{:<20}{:>18}   {:<22}{:>15}",
            left_label, left_value, right_label, right_value
        );
    }
    let _ = writeln!(out, "{}", heavy);

    let name_width = fit.names.iter().map(|n| n.len()).max().unwrap_or(0).max(12);
    let _ = writeln!(
        out,
        "{:<nw$}{:>13}{:>12}{:>12}{:>9}{:>12}{:>12}",
        "",
        "coef",
        "std err",
        "t",
        "P>|t|",
        "[0.025",
        "0.975]",
        nw = name_width
    );
    let _ = writeln!(out, "{}", light);
    for (i, name) in fit.names.iter().enumerate() {
        let (lo, hi) = fit.conf_int[i];
        let _ = writeln!(
            out,
            "{:<nw$}{:>13}{:>12}{:>12}{:>9}{:>12}{:>12}",
            name,
            fmt_coef(fit.params[i]),
            fmt_g(fit.std_errors[i]),
            fmt_g(fit.t_values[i]),
            fmt3(fit.p_values[i]),
            fmt_g(lo),
            fmt_g(hi),
            nw = name_width
        );
    }
    let _ = writeln!(out, "{}", heavy);

    let _ = writeln!(
        out,
        "{:<20}{:>18}   {:<22}{:>15}",
        "Durbin-Watson:",
        fmt3(fit.durbin_watson),
        "Jarque-Bera (JB):",
        fmt3(fit.jarque_bera)
    );
    let _ = writeln!(
        out,
        "{:<20}{:>18}   {:<22}{:>15}",
        "Skew:",
        fmt3(fit.skew),
        "Prob(JB):",
        fmt3(fit.jb_p_value)
    );
    let _ = writeln!(
        out,
        "{:<20}{:>18}   {:<22}{:>15}",
        "Kurtosis:",
        fmt3(fit.kurtosis),
        "Cond. No.",
        fmt_g(fit.condition_number)
    );
    let _ = writeln!(out, "{}", heavy);

    let notes = summary_notes(fit);
    if !notes.is_empty() {
        let _ = writeln!(out);
        let _ = writeln!(out, "Notes:");
        for (i, note) in notes.iter().enumerate() {
            let _ = writeln!(out, "[{}] {}", i + 1, note);
        }
    }
    out
}

fn summary_notes(fit: &RegressionResult) -> Vec<String> {
    let mut notes = vec!["Standard Errors assume that the covariance matrix of the errors is correctly specified.".to_string()];
    if fit.nobs < 20 {
        notes.push(format!(
            "Only {} observations; residual normality tests are unreliable below 20.",
            fit.nobs
        ));
    }
    if fit.condition_number > LARGE_CONDITION {
        notes.push(format!(
            "The condition number is large, {}. This might indicate that there are strong multicollinearity or other numerical problems.",
            fmt_g(fit.condition_number)
        ));
    }
    notes
}

fn fmt3(value: f64) -> String {
    format!("{:.3}", value)
}

fn fmt_coef(value: f64) -> String {
    let magnitude = value.abs();
    if value.is_finite() && magnitude != 0.0 && !(1e-3..1e5).contains(&magnitude) {
        format!("{:.4e}", value)
    } else {
        format!("{:.4}", value)
    }
}

/// Fixed notation for ordinary magnitudes, scientific otherwise.
fn fmt_g(value: f64) -> String {
    if !value.is_finite() {
        return format!("{}", value);
    }
    let magnitude = value.abs();
    if magnitude != 0.0 && !(1e-3..1e5).contains(&magnitude) {
        format!("{:.2e}", value)
    } else {
        format!("{:.2}", value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::MergedRecord;
    use crate::services::regression::fit_merged;

    fn sample_fit() -> RegressionResult {
        let records: Vec<MergedRecord> = (0..11)
            .map(|i| {
                let t = i as f64;
                let average_age = 12.5 / (1.0 + (-0.5 * (t - 3.0)).exp());
                let close_sp500 = 1400.0 + 200.0 * t + 30.0 * (t * 0.9).cos();
                MergedRecord {
                    year: 2012 + i,
                    average_age,
                    close_meta: 40.0 - 3.0 * average_age + 0.08 * close_sp500 + 5.0 * (t * 2.1).sin(),
                    close_sp500,
                }
            })
            .collect();
        fit_merged(&records).unwrap()
    }

    #[test]
    fn summary_lists_every_coefficient() {
        let fit = sample_fit();
        let text = format_summary(&fit);
        assert!(text.contains("OLS Regression Results"));
        assert!(text.contains("Dep. Variable:"));
        assert!(text.contains("Close_META"));
        for name in ["const", "Average Age", "Close_SP500"] {
            assert!(text.lines().any(|l| l.starts_with(name)), "missing row for {}", name);
        }
        assert!(text.contains(&format!("{:.3}", fit.r_squared)));
        assert!(text.contains("Durbin-Watson:"));
    }

    #[test]
    fn small_samples_get_a_note() {
        let fit = sample_fit();
        let notes = summary_notes(&fit);
        assert!(notes.iter().any(|n| n.contains("Only 11 observations")));
    }

    #[test]
    fn near_exact_fit_keeps_coefficient_columns_apart() {
        let records: Vec<MergedRecord> = (0..10)
            .map(|i| {
                let t = i as f64;
                let average_age = 12.0 - 0.7 * t + 0.05 * t * t;
                let close_sp500 = 1100.0 + 150.0 * t + 40.0 * (t * 1.3).sin();
                MergedRecord {
                    year: 2010 + i,
                    average_age,
                    close_meta: 3.0 + 2.0 * average_age + 0.5 * close_sp500,
                    close_sp500,
                }
            })
            .collect();
        let fit = fit_merged(&records).unwrap();
        let text = format_summary(&fit);

        for name in &fit.names {
            let row = text
                .lines()
                .find(|l| l.starts_with(name.as_str()))
                .unwrap_or_else(|| panic!("missing row for {}", name));
            let fields: Vec<&str> = row[name.len()..].split_whitespace().collect();
            assert_eq!(fields.len(), 6, "row for {} is malformed: {:?}", name, row);
            for field in &fields {
                assert!(field.parse::<f64>().is_ok(), "unparseable field {:?} in {:?}", field, row);
            }
            let std_err: f64 = fields[1].parse().unwrap();
            let i = fit.names.iter().position(|n| n == name).unwrap();
            if fit.std_errors[i] > 0.0 {
                assert!((std_err / fit.std_errors[i] - 1.0).abs() < 0.01);
            }
        }
    }

    #[test]
    fn coefficient_format_stays_within_its_column() {
        assert_eq!(fmt_coef(0.5), "0.5000");
        assert_eq!(fmt_coef(-12345.678), "-12345.6780");
        assert_eq!(fmt_coef(1.25e-11), "1.2500e-11");
    }

    #[test]
    fn general_format_switches_to_scientific() {
        assert_eq!(fmt_g(12.3456), "12.35");
        assert_eq!(fmt_g(0.0), "0.00");
        assert_eq!(fmt_g(123456.0), "1.23e5");
        assert_eq!(fmt_g(0.00001234), "1.23e-5");
        assert_eq!(fmt_g(f64::NAN), "NaN");
    }
}
