#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::tempdir;

    use crate::config::DataConfig;
    use crate::constants::{TIME_ALIASES, VALUE_ALIASES};
    use crate::error::ForecastError;
    use crate::util::file_utils::{
        load_readings_csv, parse_timestamp, resolve_column, write_readings_csv,
    };
    use crate::util::pre_processor::Reading;
    use crate::util::test_utils::{at, date};

    #[test]
    fn test_resolve_column_aliases_and_overrides() {
        let columns: Vec<String> = ["DATE_TIME", "PLANT_ID", "DAILY_YIELD", "TOTAL_YIELD"]
            .iter()
            .map(|s| s.to_string())
            .collect();

        assert_eq!(
            resolve_column(&columns, None, &TIME_ALIASES),
            Some("DATE_TIME".to_string())
        );
        assert_eq!(
            resolve_column(&columns, None, &VALUE_ALIASES),
            Some("DAILY_YIELD".to_string())
        );
        assert_eq!(
            resolve_column(&columns, Some("total_yield"), &VALUE_ALIASES),
            Some("TOTAL_YIELD".to_string())
        );
        // An explicit name that is absent is not replaced by an alias
        assert_eq!(resolve_column(&columns, Some("kwh"), &VALUE_ALIASES), None);
    }

    #[test]
    fn test_parse_timestamp_layouts() {
        let expected = at(date(2020, 5, 15), 6, 15);

        for raw in [
            "2020-05-15 06:15:00",
            "2020-05-15 06:15",
            "2020-05-15T06:15:00",
            "15-05-2020 06:15",
            "15/05/2020 06:15",
            " 2020-05-15 06:15:00 ",
            "2020-05-15T06:15:00+02:00",
        ] {
            assert_eq!(parse_timestamp(raw).unwrap(), expected, "layout {}", raw);
        }

        assert!(matches!(
            parse_timestamp("yesterday at noon"),
            Err(ForecastError::InvalidTimestamp(_))
        ));
    }

    #[test]
    fn test_load_sums_across_sources() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("plant.csv");
        fs::write(
            &path,
            "DATE_TIME,PLANT_ID,SOURCE_KEY,DAILY_YIELD\n\
             15-05-2020 06:00,4135001,inv_a,0\n\
             15-05-2020 06:00,4135001,inv_b,0\n\
             15-05-2020 06:15,4135001,inv_a,1.5\n\
             15-05-2020 06:15,4135001,inv_b,2.5\n\
             15-05-2020 06:30,4135001,inv_a,3.0\n",
        )
        .unwrap();

        let readings = load_readings_csv(&path, &DataConfig::default()).unwrap();

        let day = date(2020, 5, 15);
        assert_eq!(
            readings,
            vec![
                Reading { timestamp: at(day, 6, 0), value: 0.0 },
                Reading { timestamp: at(day, 6, 15), value: 4.0 },
                Reading { timestamp: at(day, 6, 30), value: 3.0 },
            ]
        );
    }

    #[test]
    fn test_load_keeps_largest_duplicate_without_sources() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("meter.csv");
        fs::write(
            &path,
            "timestamp,cum_power\n\
             2020-05-15 06:15:00,5.0\n\
             2020-05-15 06:00:00,1.0\n\
             2020-05-15 06:15:00,3.0\n",
        )
        .unwrap();

        let readings = load_readings_csv(&path, &DataConfig::default()).unwrap();

        assert_eq!(readings.len(), 2);
        assert_eq!(readings[0].timestamp, at(date(2020, 5, 15), 6, 0));
        assert_eq!(readings[1].value, 5.0);
    }

    #[test]
    fn test_load_integer_meter_with_late_decimal() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("wh_meter.csv");
        let mut csv = String::from("date_time,daily_yield\n");
        for minute in 0..150 {
            csv.push_str(&format!("2020-05-15 {:02}:{:02}:00,{}\n", 6 + minute / 60, minute % 60, minute));
        }
        csv.push_str("2020-05-15 08:30:00,150.5\n");
        fs::write(&path, csv).unwrap();

        let readings = load_readings_csv(&path, &DataConfig::default()).unwrap();

        assert_eq!(readings.len(), 151);
        assert_eq!(readings[149].value, 149.0);
        assert_eq!(readings[150].value, 150.5);
        assert_eq!(readings[150].timestamp, at(date(2020, 5, 15), 8, 30));
    }

    #[test]
    fn test_load_merges_same_instant_written_differently() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("mixed_layouts.csv");
        fs::write(
            &path,
            "DATE_TIME,SOURCE_KEY,DAILY_YIELD\n\
             2020-05-15 06:00,inv_a,1.0\n\
             2020-05-15 06:00:00,inv_b,2.0\n\
             15-05-2020 06:15,inv_a,3.0\n\
             2020-05-15T06:15:00,inv_b,4.0\n",
        )
        .unwrap();

        let readings = load_readings_csv(&path, &DataConfig::default()).unwrap();

        let day = date(2020, 5, 15);
        assert_eq!(
            readings,
            vec![
                Reading { timestamp: at(day, 6, 0), value: 3.0 },
                Reading { timestamp: at(day, 6, 15), value: 7.0 },
            ]
        );
    }

    #[test]
    fn test_load_with_explicit_columns() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("custom.csv");
        fs::write(
            &path,
            "when,kwh,comment\n\
             2020-05-15 06:00,0.5,ok\n\
             2020-05-15 07:00,,missing\n\
             2020-05-15 08:00,2.5,ok\n",
        )
        .unwrap();
        let config = DataConfig {
            time_column: Some("WHEN".to_string()),
            value_column: Some("kwh".to_string()),
            ..DataConfig::default()
        };

        let readings = load_readings_csv(&path, &config).unwrap();

        // Rows with an empty value are dropped
        assert_eq!(readings.len(), 2);
        assert_eq!(readings[1].value, 2.5);
    }

    #[test]
    fn test_load_reports_missing_value_column() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("no_value.csv");
        fs::write(&path, "date_time,temperature\n2020-05-15 06:00,21.0\n").unwrap();

        let err = load_readings_csv(&path, &DataConfig::default()).unwrap_err();

        assert!(matches!(err, ForecastError::MissingColumn(_)));
    }

    #[test]
    fn test_written_readings_load_back() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("out").join("readings.csv");
        let day = date(2020, 5, 15);
        let readings = vec![
            Reading { timestamp: at(day, 6, 0), value: 0.0 },
            Reading { timestamp: at(day, 6, 15), value: 0.25 },
            Reading { timestamp: at(day, 6, 30), value: 0.75 },
        ];

        write_readings_csv(&path, &readings).unwrap();
        let loaded = load_readings_csv(&path, &DataConfig::default()).unwrap();

        assert_eq!(loaded, readings);
    }
}
