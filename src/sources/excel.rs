//! Spreadsheet-backed data sources

use crate::parsers::ExcelParser;
use crate::services::api_client::{ApiClient, ConsumptionType, GrdfApi};
use crate::services::Aggregator;
use crate::types::{Frequency, GazparError, MeterReading, MeterReadingsByFrequency, Result};
use chrono::NaiveDate;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use super::DataSource;

/// Name pattern of the workbooks GrDF serves
pub const DATA_FILENAME_PATTERN: &str = "Donnees_informatives_*.xlsx";

/// Reads every frequency from one local workbook
pub struct ExcelFileDataSource {
    excel_file: PathBuf,
}

impl ExcelFileDataSource {
    pub fn new(excel_file: impl Into<PathBuf>) -> Self {
        Self {
            excel_file: excel_file.into(),
        }
    }
}

impl DataSource for ExcelFileDataSource {
    fn name(&self) -> &str {
        "excel-file"
    }

    fn get_pce_identifiers(&mut self) -> Result<Vec<String>> {
        Err(GazparError::Unsupported(
            "a spreadsheet file does not list PCE identifiers".into(),
        ))
    }

    fn load(
        &mut self,
        _pce_identifier: &str,
        _start_date: NaiveDate,
        _end_date: NaiveDate,
        frequencies: Option<&[Frequency]>,
    ) -> Result<MeterReadingsByFrequency> {
        let mut result = MeterReadingsByFrequency::new();
        for frequency in Frequency::resolve(frequencies) {
            let readings = match frequency {
                Frequency::Yearly => {
                    let daily = ExcelParser::parse_file(&self.excel_file, Frequency::Daily)?;
                    Aggregator::yearly(&daily)?
                }
                _ => ExcelParser::parse_file(&self.excel_file, frequency)?,
            };
            result.insert(frequency, readings);
        }
        Ok(result)
    }
}

/// Downloads one workbook per frequency from the GrDF API
pub struct ExcelWebDataSource<A: GrdfApi = ApiClient> {
    api: A,
    tmp_dir: PathBuf,
}

impl ExcelWebDataSource<ApiClient> {
    pub fn new(
        username: impl Into<String>,
        password: impl Into<String>,
        tmp_dir: impl Into<PathBuf>,
    ) -> Self {
        Self::with_api(ApiClient::new(username, password), tmp_dir)
    }
}

impl<A: GrdfApi> ExcelWebDataSource<A> {
    pub fn with_api(api: A, tmp_dir: impl Into<PathBuf>) -> Self {
        Self {
            api,
            tmp_dir: tmp_dir.into(),
        }
    }

    /// Remove workbooks left behind by an interrupted run
    fn remove_stale_files(&self) {
        let pattern = self.tmp_dir.join(DATA_FILENAME_PATTERN);
        let stale: Vec<PathBuf> = glob::glob(&pattern.to_string_lossy())
            .map(|paths| paths.filter_map(|e| e.ok()).collect())
            .unwrap_or_default();

        for path in stale.iter().filter(|p| p.is_file()) {
            remove_file(path);
        }
    }

    /// Download the workbook of `frequency`, parse it and delete it
    fn fetch(
        &mut self,
        pce_identifier: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
        frequency: Frequency,
    ) -> Result<Vec<MeterReading>> {
        debug!(%frequency, %start_date, %end_date, "downloading spreadsheet");

        let sheet = self.api.get_pce_consumption_excelsheet(
            ConsumptionType::Informative,
            start_date,
            end_date,
            frequency,
            &[pce_identifier],
        )?;

        let filename = Path::new(&sheet.filename)
            .file_name()
            .ok_or_else(|| {
                GazparError::Parse(format!("invalid spreadsheet name '{}'", sheet.filename))
            })?
            .to_owned();

        fs::create_dir_all(&self.tmp_dir)?;
        let path = self.tmp_dir.join(filename);
        fs::write(&path, &sheet.content)?;

        let readings = ExcelParser::parse_file(&path, frequency);
        remove_file(&path);
        readings
    }
}

fn remove_file(path: &Path) {
    if let Err(e) = fs::remove_file(path) {
        warn!(path = %path.display(), error = %e, "cannot remove spreadsheet");
    }
}

impl<A: GrdfApi> DataSource for ExcelWebDataSource<A> {
    fn name(&self) -> &str {
        "excel-web"
    }

    fn login(&mut self) -> Result<()> {
        self.api.login()
    }

    fn logout(&mut self) {
        self.api.logout()
    }

    fn get_pce_identifiers(&mut self) -> Result<Vec<String>> {
        self.api.login()?;
        self.api.get_pce_list()
    }

    fn load(
        &mut self,
        pce_identifier: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
        frequencies: Option<&[Frequency]>,
    ) -> Result<MeterReadingsByFrequency> {
        self.api.login()?;
        self.remove_stale_files();

        // Daily is fetched at most once and reused for the yearly rollup
        let mut daily: Option<Vec<MeterReading>> = None;
        let mut result = MeterReadingsByFrequency::new();

        for frequency in Frequency::resolve(frequencies) {
            let readings = match frequency {
                Frequency::Hourly => Vec::new(),
                Frequency::Daily | Frequency::Yearly => {
                    let days = match daily.take() {
                        Some(days) => days,
                        None => self.fetch(pce_identifier, start_date, end_date, Frequency::Daily)?,
                    };
                    let readings = if frequency == Frequency::Yearly {
                        Aggregator::yearly(&days)?
                    } else {
                        days.clone()
                    };
                    daily = Some(days);
                    readings
                }
                Frequency::Weekly | Frequency::Monthly => {
                    self.fetch(pce_identifier, start_date, end_date, frequency)?
                }
            };
            result.insert(frequency, readings);
        }

        info!(pce = pce_identifier, frequencies = result.len(), "spreadsheet data loaded");
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parsers::{ConsumptionPayload, WeatherPayload};
    use crate::services::api_client::ExcelSheet;
    use tempfile::TempDir;

    fn fixture_path(name: &str) -> PathBuf {
        PathBuf::from(env!("CARGO_MANIFEST_DIR"))
            .join("tests")
            .join("fixtures")
            .join(name)
    }

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    /// Serves fixture workbooks and records the requested frequencies
    #[derive(Default)]
    struct StubApi {
        logged_in: bool,
        downloads: Vec<Frequency>,
    }

    impl GrdfApi for StubApi {
        fn login(&mut self) -> Result<()> {
            self.logged_in = true;
            Ok(())
        }

        fn logout(&mut self) {
            self.logged_in = false;
        }

        fn is_logged_in(&self) -> bool {
            self.logged_in
        }

        fn get_pce_list(&mut self) -> Result<Vec<String>> {
            Ok(vec!["0123456789".into()])
        }

        fn get_pce_consumption(
            &mut self,
            _consumption_type: ConsumptionType,
            _start_date: NaiveDate,
            _end_date: NaiveDate,
            _pce_list: &[&str],
        ) -> Result<ConsumptionPayload> {
            unreachable!("spreadsheet sources never ask for JSON")
        }

        fn get_pce_consumption_excelsheet(
            &mut self,
            _consumption_type: ConsumptionType,
            _start_date: NaiveDate,
            _end_date: NaiveDate,
            frequency: Frequency,
            _pce_list: &[&str],
        ) -> Result<ExcelSheet> {
            self.downloads.push(frequency);
            let name = match frequency {
                Frequency::Daily => "Donnees_informatives_daily.xlsx",
                Frequency::Weekly => "Donnees_informatives_weekly.xlsx",
                Frequency::Monthly => "Donnees_informatives_monthly.xlsx",
                other => {
                    return Err(GazparError::Http(format!("no {} spreadsheet", other)));
                }
            };
            Ok(ExcelSheet {
                filename: name.to_string(),
                content: fs::read(fixture_path(name))?,
            })
        }

        fn get_pce_meteo(
            &mut self,
            _end_date: NaiveDate,
            _days: i64,
            _pce: &str,
        ) -> Result<WeatherPayload> {
            Ok(WeatherPayload::new())
        }
    }

    // ========== ExcelFileDataSource ==========

    #[test]
    fn test_file_source_daily() {
        let mut source = ExcelFileDataSource::new(fixture_path("Donnees_informatives_daily.xlsx"));

        let data = source
            .load("0123456789", ymd(2019, 7, 1), ymd(2019, 7, 10), Some(&[Frequency::Daily]))
            .unwrap();

        assert_eq!(data.len(), 1);
        assert_eq!(data[&Frequency::Daily].len(), 10);
    }

    #[test]
    fn test_file_source_yearly_from_daily() {
        let mut source = ExcelFileDataSource::new(fixture_path("Donnees_informatives_daily.xlsx"));

        let data = source
            .load("0123456789", ymd(2019, 7, 1), ymd(2019, 7, 10), Some(&[Frequency::Yearly]))
            .unwrap();

        let yearly = &data[&Frequency::Yearly];
        assert_eq!(yearly.len(), 1);
        assert_eq!(yearly[0].time_period, "2019");
        assert_eq!(yearly[0].energy, Some(331.0));
    }

    #[test]
    fn test_file_source_has_no_identifiers() {
        let mut source = ExcelFileDataSource::new(fixture_path("Donnees_informatives_daily.xlsx"));
        assert!(matches!(
            source.get_pce_identifiers(),
            Err(GazparError::Unsupported(_))
        ));
    }

    // ========== ExcelWebDataSource ==========

    #[test]
    fn test_web_source_yearly_downloads_daily() {
        let tmp = TempDir::new().unwrap();
        let mut source = ExcelWebDataSource::with_api(StubApi::default(), tmp.path());

        let data = source
            .load("0123456789", ymd(2019, 7, 1), ymd(2019, 7, 10), Some(&[Frequency::Yearly]))
            .unwrap();

        assert_eq!(source.api.downloads, vec![Frequency::Daily]);
        assert_eq!(data[&Frequency::Yearly].len(), 1);
        assert_eq!(data[&Frequency::Yearly][0].time_period, "2019");
    }

    #[test]
    fn test_web_source_daily_and_yearly_share_one_download() {
        let tmp = TempDir::new().unwrap();
        let mut source = ExcelWebDataSource::with_api(StubApi::default(), tmp.path());

        let data = source
            .load(
                "0123456789",
                ymd(2019, 7, 1),
                ymd(2019, 7, 10),
                Some(&[Frequency::Yearly, Frequency::Daily, Frequency::Daily]),
            )
            .unwrap();

        assert_eq!(source.api.downloads, vec![Frequency::Daily]);
        assert_eq!(data[&Frequency::Daily].len(), 10);
        assert_eq!(data[&Frequency::Yearly].len(), 1);
    }

    #[test]
    fn test_web_source_all_frequencies() {
        let tmp = TempDir::new().unwrap();
        let mut source = ExcelWebDataSource::with_api(StubApi::default(), tmp.path());

        let data = source
            .load("0123456789", ymd(2019, 5, 1), ymd(2019, 7, 10), None)
            .unwrap();

        assert_eq!(data.len(), 5);
        assert!(data[&Frequency::Hourly].is_empty());
        assert_eq!(data[&Frequency::Weekly].len(), 2);
        assert_eq!(data[&Frequency::Monthly].len(), 3);
        assert_eq!(data[&Frequency::Monthly][2].energy, Some(313.6));
        assert!(!source.api.downloads.contains(&Frequency::Hourly));
        assert!(!source.api.downloads.contains(&Frequency::Yearly));
    }

    #[test]
    fn test_web_source_cleans_tmp_dir() {
        let tmp = TempDir::new().unwrap();
        let stale = tmp.path().join("Donnees_informatives_old.xlsx");
        fs::write(&stale, b"stale").unwrap();
        let mut source = ExcelWebDataSource::with_api(StubApi::default(), tmp.path());

        source
            .load("0123456789", ymd(2019, 7, 1), ymd(2019, 7, 10), Some(&[Frequency::Daily]))
            .unwrap();

        let left: Vec<_> = fs::read_dir(tmp.path()).unwrap().collect();
        assert!(left.is_empty());
    }

    #[test]
    fn test_web_source_logs_in_for_identifiers() {
        let tmp = TempDir::new().unwrap();
        let mut source = ExcelWebDataSource::with_api(StubApi::default(), tmp.path());

        let ids = source.get_pce_identifiers().unwrap();

        assert_eq!(ids, vec!["0123456789".to_string()]);
        assert!(source.api.is_logged_in());
        source.logout();
        assert!(!source.api.is_logged_in());
    }
}
