//! Common Types Module
//!
//! 애플리케이션 전반에서 사용되는 공통 타입 정의
//!
//! - `Channel`: 발송 채널 (naver, payco, talktalk)
//! - `YearMonth`: "YYYY-MM" 월 키 (물량/동결의 기준 단위)
//! - `ChangeRequestType`, `ChangeRequestStatus`, `ProcessAction`: 변경 요청 워크플로우 상태
//!
//! DB에는 모두 소문자 문자열로 저장되고, JSON에도 같은 문자열로 직렬화됨

use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, NaiveDate, NaiveTime};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

/// 타입 파싱 에러
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("Invalid year-month (expected YYYY-MM): {0}")]
    InvalidYearMonth(String),

    #[error("Invalid channel (expected naver, payco or talktalk): {0}")]
    InvalidChannel(String),

    #[error("Invalid send time (expected HH:MM): {0}")]
    InvalidSendTime(String),

    #[error("Invalid change request type: {0}")]
    InvalidRequestType(String),

    #[error("Invalid change request status: {0}")]
    InvalidStatus(String),
}

/// API 응답 래퍼 (변경 요청 계열 응답)
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T> ApiResponse<T> {
    pub fn success(message: impl Into<String>, data: T) -> Self {
        Self {
            success: true,
            message: message.into(),
            data: Some(data),
        }
    }
}

impl ApiResponse<()> {
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
            data: None,
        }
    }
}

// ============ Channel ============

/// 발송 채널
///
/// 물량은 (조직, 월, 채널) 단위로 관리됨
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    Naver,
    Payco,
    Talktalk,
}

impl Channel {
    pub const ALL: [Channel; 3] = [Channel::Naver, Channel::Payco, Channel::Talktalk];

    pub fn as_str(&self) -> &'static str {
        match self {
            Channel::Naver => "naver",
            Channel::Payco => "payco",
            Channel::Talktalk => "talktalk",
        }
    }

    /// 화면 표시용 이름
    pub fn display_name(&self) -> &'static str {
        match self {
            Channel::Naver => "네이버앱",
            Channel::Payco => "페이앱",
            Channel::Talktalk => "톡톡",
        }
    }

    /// 쿼리 파라미터용 채널 필터 파싱
    ///
    /// 값이 없거나 `all`이면 전체 채널(None)
    pub fn parse_filter(value: Option<&str>) -> Result<Option<Channel>, TypeError> {
        match value.map(str::trim) {
            None | Some("") | Some("all") => Ok(None),
            Some(v) => v.parse().map(Some),
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Channel {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "naver" => Ok(Channel::Naver),
            "payco" => Ok(Channel::Payco),
            "talktalk" => Ok(Channel::Talktalk),
            _ => Err(TypeError::InvalidChannel(s.to_string())),
        }
    }
}

impl TryFrom<String> for Channel {
    type Error = TypeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

// ============ YearMonth ============

/// "YYYY-MM" 월 키
///
/// # Invariant
///
/// `start`는 해당 월 1일, `end`는 다음 달 1일 (12월 → 다음 해 1월)
/// 생성자에서 두 날짜를 모두 계산하므로 이후 연산은 실패하지 않음
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct YearMonth {
    start: NaiveDate,
    end: NaiveDate,
}

impl YearMonth {
    pub fn new(year: i32, month: u32) -> Result<Self, TypeError> {
        let invalid = || TypeError::InvalidYearMonth(format!("{:04}-{:02}", year, month));

        if !(1..=12).contains(&month) || !(1..=9999).contains(&year) {
            return Err(invalid());
        }

        let (next_year, next_month) = if month == 12 {
            (year + 1, 1)
        } else {
            (year, month + 1)
        };

        let start = NaiveDate::from_ymd_opt(year, month, 1).ok_or_else(invalid)?;
        let end = NaiveDate::from_ymd_opt(next_year, next_month, 1).ok_or_else(invalid)?;

        Ok(Self { start, end })
    }

    /// 날짜가 속한 월
    pub fn of(date: NaiveDate) -> Result<Self, TypeError> {
        Self::new(date.year(), date.month())
    }

    pub fn year(&self) -> i32 {
        self.start.year()
    }

    pub fn month(&self) -> u32 {
        self.start.month()
    }

    /// 월 첫날 (포함)
    pub fn first_day(&self) -> NaiveDate {
        self.start
    }

    /// 다음 달 첫날 (미포함)
    pub fn next_month_start(&self) -> NaiveDate {
        self.end
    }

    /// `[first_day, next_month_start)` 구간 포함 여부
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date < self.end
    }
}

impl fmt::Display for YearMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year(), self.month())
    }
}

impl FromStr for YearMonth {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || TypeError::InvalidYearMonth(s.to_string());
        let trimmed = s.trim();

        let (year, month) = trimmed.split_once('-').ok_or_else(invalid)?;
        if year.len() != 4 || month.len() != 2 {
            return Err(invalid());
        }

        let year: i32 = year.parse().map_err(|_| invalid())?;
        let month: u32 = month.parse().map_err(|_| invalid())?;

        Self::new(year, month).map_err(|_| invalid())
    }
}

impl TryFrom<String> for YearMonth {
    type Error = TypeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl Serialize for YearMonth {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for YearMonth {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

// ============ Send time ============

/// 발송 시간 정규화
///
/// 빈 문자열/공백은 "시간 미정"(None), 그 외에는 HH:MM 형식이어야 함
pub fn normalize_send_time(value: Option<&str>) -> Result<Option<String>, TypeError> {
    match value.map(str::trim) {
        None | Some("") => Ok(None),
        Some(v) => {
            let time = NaiveTime::parse_from_str(v, "%H:%M")
                .map_err(|_| TypeError::InvalidSendTime(v.to_string()))?;
            Ok(Some(time.format("%H:%M").to_string()))
        }
    }
}

/// 저장된 HH:MM 문자열을 시각으로 변환 (형식이 깨진 값은 None)
pub fn parse_send_time(value: &str) -> Option<NaiveTime> {
    NaiveTime::parse_from_str(value, "%H:%M").ok()
}

// ============ Change request workflow ============

/// 변경 요청 종류
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeRequestType {
    Add,
    Modify,
    Delete,
}

impl ChangeRequestType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeRequestType::Add => "add",
            ChangeRequestType::Modify => "modify",
            ChangeRequestType::Delete => "delete",
        }
    }
}

impl FromStr for ChangeRequestType {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "add" => Ok(ChangeRequestType::Add),
            "modify" => Ok(ChangeRequestType::Modify),
            "delete" => Ok(ChangeRequestType::Delete),
            _ => Err(TypeError::InvalidRequestType(s.to_string())),
        }
    }
}

impl TryFrom<String> for ChangeRequestType {
    type Error = TypeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// 변경 요청 상태
///
/// `Pending → Approved | Rejected` (둘 다 종료 상태)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeRequestStatus {
    Pending,
    Approved,
    Rejected,
}

impl ChangeRequestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeRequestStatus::Pending => "pending",
            ChangeRequestStatus::Approved => "approved",
            ChangeRequestStatus::Rejected => "rejected",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, ChangeRequestStatus::Pending)
    }
}

impl FromStr for ChangeRequestStatus {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "pending" => Ok(ChangeRequestStatus::Pending),
            "approved" => Ok(ChangeRequestStatus::Approved),
            "rejected" => Ok(ChangeRequestStatus::Rejected),
            _ => Err(TypeError::InvalidStatus(s.to_string())),
        }
    }
}

impl TryFrom<String> for ChangeRequestStatus {
    type Error = TypeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// 관리자 처리 액션
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessAction {
    Approve,
    Reject,
}

impl ProcessAction {
    /// 알 수 없는 액션은 None (호출자가 InvalidAction으로 변환)
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "approve" => Some(ProcessAction::Approve),
            "reject" => Some(ProcessAction::Reject),
            _ => None,
        }
    }

    pub fn resulting_status(&self) -> ChangeRequestStatus {
        match self {
            ProcessAction::Approve => ChangeRequestStatus::Approved,
            ProcessAction::Reject => ChangeRequestStatus::Rejected,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_year_month_parse_and_display() {
        let ym: YearMonth = "2025-03".parse().unwrap();
        assert_eq!(ym.year(), 2025);
        assert_eq!(ym.month(), 3);
        assert_eq!(ym.to_string(), "2025-03");
    }

    #[test]
    fn test_year_month_rejects_bad_input() {
        assert!("2025-13".parse::<YearMonth>().is_err());
        assert!("2025-00".parse::<YearMonth>().is_err());
        assert!("2025-3".parse::<YearMonth>().is_err());
        assert!("202503".parse::<YearMonth>().is_err());
        assert!("abcd-ef".parse::<YearMonth>().is_err());
    }

    #[test]
    fn test_december_rolls_over_to_january() {
        let ym: YearMonth = "2024-12".parse().unwrap();
        assert_eq!(ym.first_day(), NaiveDate::from_ymd_opt(2024, 12, 1).unwrap());
        assert_eq!(ym.next_month_start(), NaiveDate::from_ymd_opt(2025, 1, 1).unwrap());
        assert!(ym.contains(NaiveDate::from_ymd_opt(2024, 12, 31).unwrap()));
        assert!(!ym.contains(NaiveDate::from_ymd_opt(2025, 1, 1).unwrap()));
    }

    #[test]
    fn test_year_month_of_date() {
        let date = NaiveDate::from_ymd_opt(2025, 2, 28).unwrap();
        let ym = YearMonth::of(date).unwrap();
        assert_eq!(ym.to_string(), "2025-02");
        assert_eq!(ym.next_month_start(), NaiveDate::from_ymd_opt(2025, 3, 1).unwrap());
    }

    #[test]
    fn test_year_month_serde_as_string() {
        let ym: YearMonth = serde_json::from_str("\"2025-04\"").unwrap();
        assert_eq!(serde_json::to_string(&ym).unwrap(), "\"2025-04\"");
        assert!(serde_json::from_str::<YearMonth>("\"2025-4\"").is_err());
    }

    #[test]
    fn test_channel_parse() {
        assert_eq!("naver".parse::<Channel>().unwrap(), Channel::Naver);
        assert_eq!("TalkTalk".parse::<Channel>().unwrap(), Channel::Talktalk);
        assert!("kakao".parse::<Channel>().is_err());
        assert_eq!(Channel::parse_filter(Some("all")).unwrap(), None);
        assert_eq!(Channel::parse_filter(None).unwrap(), None);
        assert_eq!(Channel::parse_filter(Some("payco")).unwrap(), Some(Channel::Payco));
    }

    #[test]
    fn test_send_time_normalization() {
        assert_eq!(normalize_send_time(None).unwrap(), None);
        assert_eq!(normalize_send_time(Some("  ")).unwrap(), None);
        assert_eq!(normalize_send_time(Some("09:30")).unwrap(), Some("09:30".to_string()));
        assert!(normalize_send_time(Some("9시")).is_err());
        assert!(normalize_send_time(Some("25:00")).is_err());
    }

    #[test]
    fn test_process_action() {
        assert_eq!(ProcessAction::parse("approve"), Some(ProcessAction::Approve));
        assert_eq!(ProcessAction::parse("REJECT"), Some(ProcessAction::Reject));
        assert_eq!(ProcessAction::parse("cancel"), None);
        assert!(ProcessAction::Approve.resulting_status().is_terminal());
    }
}
