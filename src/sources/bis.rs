//! BIS SDMX-ML 2.1 structure-specific data messages.

use crate::calendar::parse_quarter_label;
use crate::error::FetchError;
use crate::series::RawSeries;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

/// Collects every `<Obs TIME_PERIOD=".." OBS_VALUE=".."/>` in the message.
///
/// Quarterly periods become quarter-end dates. Observations without an
/// `OBS_VALUE` attribute are skipped; a non-numeric value or an unknown
/// period format fails the whole message.
pub fn parse_sdmx_observations(xml: &[u8]) -> Result<RawSeries, FetchError> {
    let mut reader = Reader::from_reader(xml);
    reader.trim_text(true);

    let mut buf = Vec::new();
    let mut observations = RawSeries::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(element)) | Ok(Event::Empty(element))
                if element.local_name().as_ref() == b"Obs" =>
            {
                if let Some(observation) = read_observation(&element, &reader)? {
                    observations.push(observation);
                }
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => {
                return Err(FetchError::Parse(format!(
                    "SDMX-ML at byte {}: {}",
                    reader.buffer_position(),
                    e
                )))
            }
        }
        buf.clear();
    }

    if observations.is_empty() {
        return Err(FetchError::EmptyPayload("SDMX-ML message has no observations".to_string()));
    }

    observations.sort_by_key(|(date, _)| *date);
    Ok(observations)
}

fn read_observation(
    element: &BytesStart<'_>,
    reader: &Reader<&[u8]>,
) -> Result<Option<(chrono::NaiveDate, Option<f64>)>, FetchError> {
    let mut period = None;
    let mut value = None;

    for attribute in element.attributes() {
        let attribute = attribute.map_err(|e| FetchError::Parse(e.to_string()))?;
        let text = attribute
            .decode_and_unescape_value(reader)
            .map_err(|e| FetchError::Parse(e.to_string()))?
            .into_owned();
        match attribute.key.local_name().as_ref() {
            b"TIME_PERIOD" => period = Some(text),
            b"OBS_VALUE" => value = Some(text),
            _ => {}
        }
    }

    let Some(value) = value else {
        return Ok(None);
    };
    let period = period.ok_or_else(|| FetchError::Parse("Obs without TIME_PERIOD".to_string()))?;
    let date = parse_quarter_label(&period)
        .ok_or_else(|| FetchError::Parse(format!("SDMX period '{}'", period)))?;
    let value = value
        .trim()
        .parse::<f64>()
        .map_err(|_| FetchError::Parse(format!("SDMX value '{}' for {}", value, period)))?;

    Ok(Some((date, Some(value))))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    const MESSAGE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<message:StructureSpecificData xmlns:message="http://www.sdmx.org/resources/sdmxml/schemas/v2_1/message">
  <message:Header><message:ID>IDREF1</message:ID></message:Header>
  <message:DataSet ss:dataScope="DataStructure" xmlns:ss="http://www.sdmx.org/resources/sdmxml/schemas/v2_1/data/structurespecific">
    <Series FREQ="Q" ISSUE_CUR="TO1">
      <Obs TIME_PERIOD="2024-Q2" OBS_VALUE="30125.4" OBS_STATUS="A"/>
      <Obs TIME_PERIOD="2024-Q1" OBS_VALUE="29880"/>
      <Obs TIME_PERIOD="2023-Q4" OBS_STATUS="M"/>
    </Series>
  </message:DataSet>
</message:StructureSpecificData>"#;

    #[test]
    fn test_reads_observations_and_skips_valueless() {
        let series = parse_sdmx_observations(MESSAGE.as_bytes()).unwrap();
        assert_eq!(
            series,
            vec![
                (NaiveDate::from_ymd_opt(2024, 3, 31).unwrap(), Some(29880.0)),
                (NaiveDate::from_ymd_opt(2024, 6, 30).unwrap(), Some(30125.4)),
            ]
        );
    }

    #[test]
    fn test_message_without_observations_is_empty() {
        let xml = r#"<message:StructureSpecificData xmlns:message="m"><message:DataSet/></message:StructureSpecificData>"#;
        assert!(matches!(
            parse_sdmx_observations(xml.as_bytes()),
            Err(FetchError::EmptyPayload(_))
        ));
    }

    #[test]
    fn test_garbage_value_is_parse_error() {
        let xml = r#"<DataSet><Series><Obs TIME_PERIOD="2024-Q1" OBS_VALUE="n/a"/></Series></DataSet>"#;
        assert!(matches!(
            parse_sdmx_observations(xml.as_bytes()),
            Err(FetchError::Parse(_))
        ));
    }
}
