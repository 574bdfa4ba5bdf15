use anyhow::{anyhow, Context, Result};
use athlete_features::features::round_to;
use athlete_features::synth::FatigueRow;
use athlete_features::{bmi, FeatureSource, ModelVariant, PlayerProfile};
use csv::StringRecord;
use std::io;

/// Header lookup for a loaded CSV.
struct Columns {
    headers: StringRecord,
}

impl Columns {
    fn index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h.trim() == name)
    }

    fn require(&self, name: &str) -> Result<usize> {
        self.index(name)
            .ok_or_else(|| anyhow!("training data has no '{}' column", name))
    }
}

fn value(record: &StringRecord, idx: usize, name: &str, line: usize) -> Result<f64> {
    let raw = record
        .get(idx)
        .ok_or_else(|| anyhow!("line {}: missing '{}' value", line, name))?;
    raw.trim()
        .parse::<f64>()
        .with_context(|| format!("line {}: '{}' is not a number: {:?}", line, name, raw))
}

/// Reads a training CSV and lays every row out in `variant`'s feature order,
/// deriving BMI and the age ratios the same way the serving path does.
/// Weight and height are rounded to 2 decimals first, as the training
/// notebooks did.
pub fn training_rows<R: io::Read>(reader: R, variant: ModelVariant) -> Result<Vec<Vec<f64>>> {
    let mut rdr = csv::Reader::from_reader(reader);
    let cols = Columns {
        headers: rdr.headers().context("failed to read CSV header")?.clone(),
    };

    let mut rows = Vec::new();
    for (i, record) in rdr.records().enumerate() {
        // header is line 1
        let line = i + 2;
        let record = record.with_context(|| format!("line {}: malformed CSV record", line))?;
        let get = |name: &str| -> Result<f64> { value(&record, cols.require(name)?, name, line) };

        let row = match variant {
            ModelVariant::Fatigue => vec![get("Speed")?, get("Strength")?, get("Stamina")?],
            ModelVariant::InjuryTriage => {
                let bmi_value = match cols.index("BMI") {
                    Some(idx) => value(&record, idx, "BMI", line)?,
                    None => bmi(
                        round_to(get("Player_Weight")?, 2),
                        round_to(get("Player_Height")?, 2),
                    )
                    .with_context(|| format!("line {}", line))?,
                };
                vec![get("Previous_Injuries")?, get("Training_Intensity")?, bmi_value]
            }
            ModelVariant::InjuryBinary => {
                let profile = PlayerProfile::new(
                    get("Player_Age")?,
                    get("Player_Weight")?,
                    get("Player_Height")?,
                    get("Previous_Injuries")?,
                )
                .with_context(|| format!("line {}", line))?
                .rounded_for_training();
                profile
                    .features()
                    .with_context(|| format!("line {}", line))?
                    .values()
                    .to_vec()
            }
        };
        rows.push(row);
    }
    Ok(rows)
}

pub fn write_fatigue_csv<W: io::Write>(writer: W, rows: &[FatigueRow]) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);
    for row in rows {
        wtr.serialize(row).context("failed to write CSV row")?;
    }
    wtr.flush().context("failed to flush CSV")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use athlete_features::synth::FatigueSynthesizer;

    #[test]
    fn test_injury_rows_are_derived_in_contract_order() {
        let csv = "Player_Age,Player_Weight,Player_Height,Previous_Injuries,Training_Intensity,Recovery_Time,Likelihood_of_Injury\n\
                   25,80.004,180.0,2,0.5,3,1\n\
                   20,70,175,0,0.2,1,0\n";
        let rows = training_rows(csv.as_bytes(), ModelVariant::InjuryBinary).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].len(), 7);
        // weight rounded before BMI
        assert_eq!(rows[0][1], 80.0);
        assert!((rows[0][4] - 80.0 / (1.8 * 1.8)).abs() < 1e-9);
        assert!((rows[0][6] - 0.08).abs() < 1e-12);
    }

    #[test]
    fn test_triage_derives_bmi_when_column_absent() {
        let csv = "Previous_Injuries,Training_Intensity,Player_Weight,Player_Height\n1,0.7,80,200\n";
        let rows = training_rows(csv.as_bytes(), ModelVariant::InjuryTriage).unwrap();
        assert_eq!(rows, vec![vec![1.0, 0.7, 20.0]]);
    }

    #[test]
    fn test_missing_column_and_bad_value_are_reported() {
        let err = training_rows("Speed,Strength\n1,2\n".as_bytes(), ModelVariant::Fatigue)
            .unwrap_err();
        assert!(err.to_string().contains("Stamina"));

        let err = training_rows(
            "Speed,Strength,Stamina\n1,2,x\n".as_bytes(),
            ModelVariant::Fatigue,
        )
        .unwrap_err();
        assert!(format!("{:#}", err).contains("line 2"));
    }

    #[test]
    fn test_synthetic_csv_reads_back_as_fatigue_rows() {
        let rows = FatigueSynthesizer::new(42).rows(25);
        let mut buf = Vec::new();
        write_fatigue_csv(&mut buf, &rows).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert!(text.starts_with("Speed,Strength,Stamina,Fatigue\n"));
        let features = training_rows(text.as_bytes(), ModelVariant::Fatigue).unwrap();
        assert_eq!(features.len(), 25);
        assert_eq!(features[0], vec![rows[0].speed as f64, rows[0].strength as f64, rows[0].stamina as f64]);
    }
}
