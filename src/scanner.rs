use crate::{Error, Result};
use memchr::memchr;
use memchr::memmem::Finder;
use once_cell::unsync::Lazy;
use std::str;

/// Actions carrying replay telemetry start with 0x6b followed by the null
/// terminated string "dr.x". There is no length prefix and several actions
/// can share one packet, so records are located by searching for this
/// signature and the scan tolerates false matches.
pub const TELEMETRY_MARKER: [u8; 6] = [0x6b, b'd', b'r', b'.', b'x', 0x00];

thread_local! {
    static MARKER_FINDER: Lazy<Finder<'static>> = Lazy::new(|| Finder::new(&TELEMETRY_MARKER));
}

/// One telemetry triple as it appears on the wire: a namespace string, a key
/// string and four raw value bytes.
#[derive(Debug, Clone, PartialEq)]
pub struct RawRecord<'a> {
    pub namespace: &'a [u8],
    pub key: &'a [u8],
    pub value: [u8; 4],
}

impl<'a> RawRecord<'a> {
    pub fn value_u32(&self) -> u32 {
        u32::from_le_bytes(self.value)
    }

    /// The value bytes read as a string. Item and hero rawcodes arrive
    /// byte-reversed, so the bytes are un-reversed here.
    pub fn value_string(&self) -> String {
        let mut bytes = self.value;
        bytes.reverse();
        String::from_utf8_lossy(&bytes).into_owned()
    }

    pub fn namespace_str(&self) -> Result<&'a str> {
        str::from_utf8(self.namespace).map_err(|_| Error::Malformed)
    }

    pub fn key_str(&self) -> Result<&'a str> {
        str::from_utf8(self.key).map_err(|_| Error::Malformed)
    }
}

/// Iterator over the telemetry records embedded in one action blob.
///
/// A marker match that is not followed by a complete record advances the
/// scan by a single byte and keeps searching. This is deliberate: the
/// marker is a heuristic, and skipping further would drop telemetry that
/// merely happens to sit at an unlucky offset.
pub struct TelemetryScanner<'a> {
    action: &'a [u8],
    pos: usize,
}

impl<'a> TelemetryScanner<'a> {
    pub fn new(action: &'a [u8]) -> Self {
        TelemetryScanner { action, pos: 0 }
    }

    /// Parse the record whose marker starts at `start`, returning it along
    /// with the offset just past its value bytes.
    fn record_at(&self, start: usize) -> Result<(RawRecord<'a>, usize)> {
        let namespace_at = start + TELEMETRY_MARKER.len();
        let namespace = read_cstring(self.action, namespace_at)?;
        let key_at = namespace_at + namespace.len() + 1;
        let key = read_cstring(self.action, key_at)?;
        let value_at = key_at + key.len() + 1;
        let value = self
            .action
            .get(value_at..value_at + 4)
            .ok_or(Error::Incomplete)?;
        let mut value_bytes = [0u8; 4];
        value_bytes.copy_from_slice(value);
        Ok((
            RawRecord {
                namespace,
                key,
                value: value_bytes,
            },
            value_at + 4,
        ))
    }
}

impl<'a> Iterator for TelemetryScanner<'a> {
    type Item = RawRecord<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        while self.pos < self.action.len() {
            let offset = MARKER_FINDER.with(|finder| finder.find(&self.action[self.pos..]))?;
            let start = self.pos + offset;
            match self.record_at(start) {
                Ok((record, next_pos)) => {
                    self.pos = next_pos;
                    return Some(record);
                }
                Err(_) => {
                    self.pos = start + 1;
                }
            }
        }
        None
    }
}

fn read_cstring(input: &[u8], start: usize) -> Result<&[u8]> {
    let rest = input.get(start..).ok_or(Error::Incomplete)?;
    let end = memchr(0, rest).ok_or(Error::Incomplete)?;
    Ok(&rest[..end])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(namespace: &[u8], key: &[u8], value: [u8; 4]) -> Vec<u8> {
        let mut data = TELEMETRY_MARKER.to_vec();
        data.extend_from_slice(namespace);
        data.push(0);
        data.extend_from_slice(key);
        data.push(0);
        data.extend_from_slice(&value);
        data
    }

    #[test]
    fn single_record() {
        let data = record(b"Data", b"CSK4", 17u32.to_le_bytes());
        let records: Vec<_> = TelemetryScanner::new(&data).collect();
        assert_eq!(
            records,
            vec![RawRecord {
                namespace: b"Data",
                key: b"CSK4",
                value: 17u32.to_le_bytes(),
            }]
        );
        assert_eq!(records[0].value_u32(), 17);
    }

    #[test]
    fn record_with_leading_noise() {
        let mut data = vec![0x10, 0x6b, 0x01];
        data.extend(record(b"Global", b"Winner", 2u32.to_le_bytes()));
        let records: Vec<_> = TelemetryScanner::new(&data).collect();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].key, b"Winner");
    }

    #[test]
    fn back_to_back_records() {
        let mut data = record(b"Data", b"CSK1", 3u32.to_le_bytes());
        data.extend(record(b"Data", b"CSD1", 4u32.to_le_bytes()));
        let records: Vec<_> = TelemetryScanner::new(&data).collect();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].key, b"CSK1");
        assert_eq!(records[1].key, b"CSD1");
    }

    #[test]
    fn truncated_record_is_skipped() {
        // marker followed by less than a full triple
        let mut data = TELEMETRY_MARKER.to_vec();
        data.push(b'D');
        let records: Vec<_> = TelemetryScanner::new(&data).collect();
        assert!(records.is_empty());
    }

    #[test]
    fn truncated_value_is_skipped() {
        let mut data = TELEMETRY_MARKER.to_vec();
        data.extend_from_slice(b"Data\0Winner\0\x01\x02");
        let records: Vec<_> = TelemetryScanner::new(&data).collect();
        assert!(records.is_empty());
    }

    #[test]
    fn doubled_marker_merges_into_false_record() {
        let mut data = TELEMETRY_MARKER.to_vec();
        data.extend(record(b"Data", b"NK7", 9u32.to_le_bytes()));
        let records: Vec<_> = TelemetryScanner::new(&data).collect();
        // the first marker swallows the second as its namespace; the scan
        // takes the heuristic match as-is and classification later drops the
        // nonsense triple
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].namespace, &TELEMETRY_MARKER[..5]);
        assert_eq!(records[0].key, b"Data");
    }

    #[test]
    fn marker_alone_is_ignored() {
        let records: Vec<_> = TelemetryScanner::new(&TELEMETRY_MARKER).collect();
        assert!(records.is_empty());
    }

    #[test]
    fn empty_namespace_parses() {
        let data = record(b"", b"m", 35u32.to_le_bytes());
        let records: Vec<_> = TelemetryScanner::new(&data).collect();
        assert_eq!(records.len(), 1);
        assert!(records[0].namespace.is_empty());
    }

    #[test]
    fn value_string_reverses_bytes() {
        let data = record(b"1", b"9", *b"maeH");
        let records: Vec<_> = TelemetryScanner::new(&data).collect();
        assert_eq!(records[0].value_string(), "Heam");
    }
}
