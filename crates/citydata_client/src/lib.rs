//! Seoul real-time city data client.
//!
//! Fetches the `citydata_ppltn` (real-time population) dataset for one
//! monitoring area from the Seoul Open Data API and reduces the XML payload to
//! a `FeedReading`.

pub mod rate_limit;

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, NaiveDateTime, TimeZone};
use common::config::FeedConfig;
use common::{CongestionFeed, CongestionLevel, Error, FeedReading};
use quick_xml::events::Event;
use quick_xml::Reader;
use tracing::debug;
use url::Url;

pub use rate_limit::RateLimiter;

/// Result code the API uses for a successful call.
const SUCCESS_CODE: &str = "INFO-000";
/// `PPLTN_TIME` is Seoul local time without an offset.
const PPLTN_TIME_FORMAT: &str = "%Y-%m-%d %H:%M";
const KST_OFFSET_SECS: i32 = 9 * 3600;

/// Citydata API client with connection pooling and a shared rate limiter.
#[derive(Debug, Clone)]
pub struct CitydataClient {
    client: reqwest::Client,
    base_url: Url,
    api_key: String,
    limiter: RateLimiter,
}

impl CitydataClient {
    pub fn new(cfg: &FeedConfig) -> Result<Self, Error> {
        let base_url = Url::parse(&cfg.base_url)
            .map_err(|e| Error::Config(format!("feed.base_url is not a valid URL: {}", e)))?;

        let client = reqwest::Client::builder()
            .user_agent("toilet-finder/0.1")
            .pool_max_idle_per_host(cfg.max_concurrent_fetches.max(1))
            .timeout(Duration::from_secs(cfg.request_timeout_secs))
            .build()
            .map_err(|e| Error::Http(format!("failed to build citydata HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url,
            api_key: cfg.api_key.clone(),
            limiter: RateLimiter::per_second(cfg.requests_per_second),
        })
    }

    /// `{base}/{key}/xml/citydata_ppltn/1/5/{area}` with the area name
    /// percent-encoded as a single path segment.
    fn area_url(&self, area: &str) -> Result<Url, Error> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| Error::Config("feed.base_url cannot be a base URL".into()))?
            .pop_if_empty()
            .extend([self.api_key.as_str(), "xml", "citydata_ppltn", "1", "5", area]);
        Ok(url)
    }

    /// Fetch the raw XML body for an area.
    pub async fn fetch_xml(&self, area: &str) -> Result<String, Error> {
        let url = self.area_url(area)?;
        self.limiter.wait().await;

        debug!("Fetching citydata for {}", area);

        let resp = self
            .client
            .get(url)
            .header("Accept", "application/xml")
            .send()
            .await
            .map_err(|e| unavailable(area, format!("HTTP error: {}", e)))?;

        let status = resp.status().as_u16();
        if status != 200 {
            let body = resp.text().await.unwrap_or_default();
            return Err(unavailable(
                area,
                format!("citydata returned {}: {}", status, truncate(&body, 300)),
            ));
        }

        resp.text()
            .await
            .map_err(|e| unavailable(area, format!("failed to read body: {}", e)))
    }

    /// Fetch and parse the current congestion reading for an area.
    pub async fn get_reading(&self, area: &str) -> Result<FeedReading, Error> {
        let body = self.fetch_xml(area).await?;
        let reading = parse_citydata_xml(area, &body)?;

        debug!(
            "{}: level={} observed_at={}",
            reading.area_name,
            reading.level.as_str(),
            reading.observed_at
        );

        Ok(reading)
    }
}

#[async_trait]
impl CongestionFeed for CitydataClient {
    async fn fetch(&self, area_name: &str) -> Result<FeedReading, Error> {
        self.get_reading(area_name).await
    }
}

// ── XML parsing ───────────────────────────────────────────────────────

#[derive(Debug, Default)]
struct RawCitydata {
    result_code: Option<String>,
    result_message: Option<String>,
    ppltn_time: Option<String>,
    area_nm: Option<String>,
    congest_lvl: Option<String>,
}

impl RawCitydata {
    fn set_first(slot: &mut Option<String>, text: String) {
        if slot.is_none() {
            *slot = Some(text);
        }
    }
}

/// Reduce a `citydata_ppltn` XML document to a `FeedReading`.
///
/// `area` is the requested area, used only for error context.
pub fn parse_citydata_xml(area: &str, xml: &str) -> Result<FeedReading, Error> {
    let raw = scan_fields(area, xml)?;

    if let Some(code) = raw.result_code.as_deref() {
        if code != SUCCESS_CODE {
            return Err(unavailable(
                area,
                format!(
                    "API result {}: {}",
                    code,
                    raw.result_message.as_deref().unwrap_or("")
                ),
            ));
        }
    }

    let area_name = raw
        .area_nm
        .filter(|s| !s.is_empty())
        .ok_or_else(|| malformed(area, "missing AREA_NM"))?;
    let label = raw
        .congest_lvl
        .ok_or_else(|| malformed(area, "missing AREA_CONGEST_LVL"))?;
    let time = raw
        .ppltn_time
        .ok_or_else(|| malformed(area, "missing PPLTN_TIME"))?;

    let level = CongestionLevel::from_feed_label(&label)
        .ok_or_else(|| malformed(area, format!("unknown congestion level '{}'", label)))?;
    let observed_at = parse_ppltn_time(area, &time)?;

    Ok(FeedReading {
        area_name,
        observed_at,
        level,
    })
}

fn scan_fields(area: &str, xml: &str) -> Result<RawCitydata, Error> {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);

    let mut raw = RawCitydata::default();
    let mut tag: Option<String> = None;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                tag = Some(String::from_utf8_lossy(e.name().as_ref()).into_owned());
            }
            Ok(Event::End(_)) => tag = None,
            Ok(Event::Text(t)) => {
                let Some(name) = tag.as_deref() else { continue };
                let text = t
                    .unescape()
                    .map_err(|e| malformed(area, format!("bad text in <{}>: {}", name, e)))?
                    .trim()
                    .to_string();
                match name {
                    "RESULT.CODE" | "CODE" => RawCitydata::set_first(&mut raw.result_code, text),
                    "RESULT.MESSAGE" | "MESSAGE" => {
                        RawCitydata::set_first(&mut raw.result_message, text)
                    }
                    "PPLTN_TIME" => RawCitydata::set_first(&mut raw.ppltn_time, text),
                    "AREA_NM" => RawCitydata::set_first(&mut raw.area_nm, text),
                    "AREA_CONGEST_LVL" => RawCitydata::set_first(&mut raw.congest_lvl, text),
                    _ => {}
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(malformed(area, format!("XML error: {}", e))),
            _ => {}
        }
    }

    Ok(raw)
}

fn parse_ppltn_time(area: &str, raw: &str) -> Result<DateTime<FixedOffset>, Error> {
    let naive = NaiveDateTime::parse_from_str(raw, PPLTN_TIME_FORMAT)
        .map_err(|e| malformed(area, format!("bad PPLTN_TIME '{}': {}", raw, e)))?;
    let kst = FixedOffset::east_opt(KST_OFFSET_SECS)
        .ok_or_else(|| malformed(area, "invalid KST offset"))?;
    kst.from_local_datetime(&naive)
        .single()
        .ok_or_else(|| malformed(area, format!("ambiguous PPLTN_TIME '{}'", raw)))
}

fn unavailable(area: &str, reason: impl Into<String>) -> Error {
    Error::FeedUnavailable {
        area: area.to_string(),
        reason: reason.into(),
    }
}

fn malformed(area: &str, reason: impl Into<String>) -> Error {
    Error::FeedMalformed {
        area: area.to_string(),
        reason: reason.into(),
    }
}

fn truncate(s: &str, max_chars: usize) -> &str {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Timelike;

    fn sample_response() -> &'static str {
        r#"<?xml version="1.0" encoding="UTF-8"?>
<SeoulRtd.citydata_ppltn>
  <list_total_count>1</list_total_count>
  <RESULT>
    <RESULT.CODE>INFO-000</RESULT.CODE>
    <RESULT.MESSAGE>정상 처리되었습니다.</RESULT.MESSAGE>
  </RESULT>
  <SeoulRtd.citydata_ppltn>
    <AREA_NM>강남역</AREA_NM>
    <AREA_CD>POI014</AREA_CD>
    <AREA_CONGEST_LVL>약간 붐빔</AREA_CONGEST_LVL>
    <AREA_CONGEST_MSG>사람들이 몰려있을 가능성이 크고 붐빈다고 느낄 수 있어요.</AREA_CONGEST_MSG>
    <PPLTN_TIME>2023-06-01 14:30</PPLTN_TIME>
    <FCST_PPLTN>
      <FCST_PPLTN>
        <FCST_TIME>2023-06-01 15:00</FCST_TIME>
        <FCST_CONGEST_LVL>붐빔</FCST_CONGEST_LVL>
      </FCST_PPLTN>
    </FCST_PPLTN>
  </SeoulRtd.citydata_ppltn>
</SeoulRtd.citydata_ppltn>"#
    }

    #[test]
    fn test_parse_success() {
        let reading = parse_citydata_xml("강남역", sample_response()).expect("should parse");

        assert_eq!(reading.area_name, "강남역");
        assert_eq!(reading.level, CongestionLevel::SlightlyCrowded);
        assert_eq!(reading.observed_at.hour(), 14);
        assert_eq!(reading.observed_at.minute(), 30);
        assert_eq!(reading.observed_at.offset().local_minus_utc(), KST_OFFSET_SECS);
    }

    #[test]
    fn test_api_error_code_is_unavailable() {
        let xml = r#"<RESULT><CODE>ERROR-500</CODE><MESSAGE>서버 오류입니다.</MESSAGE></RESULT>"#;
        let err = parse_citydata_xml("강남역", xml).unwrap_err();
        assert!(matches!(err, Error::FeedUnavailable { .. }), "got {err:?}");
    }

    #[test]
    fn test_missing_level_is_malformed() {
        let xml = r#"<SeoulRtd.citydata_ppltn>
            <AREA_NM>강남역</AREA_NM>
            <PPLTN_TIME>2023-06-01 14:30</PPLTN_TIME>
        </SeoulRtd.citydata_ppltn>"#;
        let err = parse_citydata_xml("강남역", xml).unwrap_err();
        assert!(matches!(err, Error::FeedMalformed { .. }), "got {err:?}");
    }

    #[test]
    fn test_unknown_level_is_malformed() {
        let xml = sample_response().replace("약간 붐빔</AREA_CONGEST_LVL>", "혼잡</AREA_CONGEST_LVL>");
        let err = parse_citydata_xml("강남역", &xml).unwrap_err();
        assert!(matches!(err, Error::FeedMalformed { .. }), "got {err:?}");
    }

    #[test]
    fn test_bad_time_is_malformed() {
        let xml = sample_response().replace("2023-06-01 14:30", "yesterday");
        let err = parse_citydata_xml("강남역", &xml).unwrap_err();
        assert!(matches!(err, Error::FeedMalformed { .. }), "got {err:?}");
    }

    #[test]
    fn test_area_url_encodes_name() {
        let cfg = FeedConfig {
            api_key: "KEY".into(),
            ..FeedConfig::default()
        };
        let client = CitydataClient::new(&cfg).expect("client builds");
        let url = client.area_url("광화문·덕수궁").expect("url builds");

        assert!(url
            .as_str()
            .starts_with("http://openapi.seoul.go.kr:8088/KEY/xml/citydata_ppltn/1/5/"));
        assert!(!url.as_str().contains('·'));
    }

    #[test]
    fn test_truncate_respects_char_boundaries() {
        assert_eq!(truncate("붐빔붐빔", 2), "붐빔");
        assert_eq!(truncate("ok", 10), "ok");
    }
}
