use bytes::{BufMut, Bytes, BytesMut};

/// Four-byte Annex-B start code that prefixes every access unit handed to a decoder
pub const START_CODE: [u8; 4] = [0x00, 0x00, 0x00, 0x01];

/// Splits an elementary stream on `00 00 00 01` and re-prefixes every piece
/// with the start code, ready to be passed to `decode_frames` one by one.
///
/// Bytes before the first start code are dropped, as are empty pieces left by
/// back-to-back start codes.
pub fn split_access_units(data: &[u8]) -> Vec<Bytes> {
    let mut marks = Vec::new();
    let mut i = 0;
    while i + START_CODE.len() <= data.len() {
        if data[i..i + START_CODE.len()] == START_CODE {
            marks.push(i);
            i += START_CODE.len();
        } else {
            i += 1;
        }
    }

    let mut units = Vec::with_capacity(marks.len());
    for (n, &mark) in marks.iter().enumerate() {
        let start = mark + START_CODE.len();
        let end = marks.get(n + 1).copied().unwrap_or(data.len());
        if start == end {
            continue;
        }
        let mut unit = BytesMut::with_capacity(START_CODE.len() + end - start);
        unit.put_slice(&START_CODE);
        unit.put_slice(&data[start..end]);
        units.push(unit.freeze());
    }
    units
}

/// Position of the next three-byte start code at or after `from`
fn find_start_code(data: &[u8], from: usize) -> Option<usize> {
    if data.len() < 3 {
        return None;
    }
    (from..data.len() - 2).find(|&i| data[i] == 0 && data[i + 1] == 0 && data[i + 2] == 1)
}

/// Iterates the NAL unit payloads of an Annex-B region.
///
/// Accepts both three and four byte start codes. Trailing zero bytes of a
/// unit are trimmed, so the leading zero of a four byte start code never
/// leaks into the previous unit.
pub struct NalUnitIter {
    data: Bytes,
    cursor: Option<usize>,
}

impl NalUnitIter {
    /// Iterates the NAL units of `data`, skipping bytes before the first start code
    pub fn new(data: Bytes) -> Self {
        let cursor = find_start_code(&data, 0).map(|i| i + 3);
        Self { data, cursor }
    }
}

impl Iterator for NalUnitIter {
    type Item = Bytes;

    fn next(&mut self) -> Option<Bytes> {
        loop {
            let start = self.cursor?;
            let (end, next) = match find_start_code(&self.data, start) {
                Some(i) => (i, Some(i + 3)),
                None => (self.data.len(), None),
            };
            self.cursor = next;

            let mut stop = end;
            while stop > start && self.data[stop - 1] == 0 {
                stop -= 1;
            }
            if stop > start {
                return Some(self.data.slice(start..stop));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_split_access_units() {
        let stream = [
            0xAA, // garbage before the first start code
            0x00, 0x00, 0x00, 0x01, 0x67, 0x42, //
            0x00, 0x00, 0x00, 0x01, 0x68, 0xCE, //
            0x00, 0x00, 0x00, 0x01, 0x65, 0x88, 0x84,
        ];
        let units = split_access_units(&stream);
        assert_eq!(
            units,
            vec![
                Bytes::from_static(&[0x00, 0x00, 0x00, 0x01, 0x67, 0x42]),
                Bytes::from_static(&[0x00, 0x00, 0x00, 0x01, 0x68, 0xCE]),
                Bytes::from_static(&[0x00, 0x00, 0x00, 0x01, 0x65, 0x88, 0x84]),
            ]
        );
    }

    #[test]
    fn test_split_skips_empty_units() {
        let stream = [0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x01, 0x41];
        assert_eq!(
            split_access_units(&stream),
            vec![Bytes::from_static(&[0x00, 0x00, 0x00, 0x01, 0x41])]
        );
        assert!(split_access_units(&[0x41, 0x42]).is_empty());
    }

    #[test]
    fn test_nal_unit_iter_mixed_start_codes() {
        let region = Bytes::from_static(&[
            0x00, 0x00, 0x00, 0x01, 0x67, 0x42, 0x00, 0x1F, //
            0x00, 0x00, 0x01, 0x68, 0xCE, //
            0x00, 0x00, 0x00, 0x01, 0x65, 0x88,
        ]);
        let units: Vec<Bytes> = NalUnitIter::new(region).collect();
        assert_eq!(
            units,
            vec![
                Bytes::from_static(&[0x67, 0x42, 0x00, 0x1F]),
                Bytes::from_static(&[0x68, 0xCE]),
                Bytes::from_static(&[0x65, 0x88]),
            ]
        );
    }

    #[test]
    fn test_nal_unit_iter_without_start_code() {
        assert_eq!(NalUnitIter::new(Bytes::from_static(&[0x65, 0x88])).count(), 0);
        assert_eq!(NalUnitIter::new(Bytes::new()).count(), 0);
        assert_eq!(NalUnitIter::new(Bytes::from_static(&[0x00, 0x00, 0x01])).count(), 0);
    }
}
