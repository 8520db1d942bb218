use bytes::Bytes;

/// A single NAL unit, header byte included, start code stripped
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NalUnit {
    /// nal_unit_type, the low five header bits
    pub nal_type: u8,
    /// nal_ref_idc, non-zero for reference pictures and parameter sets
    pub nal_ref_idc: u8,
    /// Header byte plus payload
    pub data: Bytes,
}

impl NalUnit {
    /// Reads the header byte of `data`. Returns `None` for an empty unit or
    /// one with the forbidden_zero_bit set.
    pub fn parse(data: Bytes) -> Option<Self> {
        let header = *data.first()?;
        if header & 0x80 != 0 {
            return None;
        }
        Some(Self {
            nal_type: header & 0x1F,
            nal_ref_idc: (header >> 5) & 0x03,
            data,
        })
    }

    /// Typed view of `nal_type`
    pub fn unit_type(&self) -> NalUnitType {
        NalUnitType::from(self.nal_type)
    }

    /// Coded slice data, i.e. input that can yield a picture
    pub fn is_vcl(&self) -> bool {
        (1..=5).contains(&self.nal_type)
    }

    /// IDR slice or parameter set
    pub fn is_keyframe(&self) -> bool {
        self.nal_type == 5 || self.nal_type == 7 || self.nal_type == 8
    }
}

/// H.264 NAL unit types 0 through 12
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NalUnitType {
    /// Unspecified or reserved type
    Unspecified = 0,
    /// Coded slice of a non-IDR picture
    CodedSliceNonIDR = 1,
    /// Coded slice data partition A
    CodedSliceDataPartitionA = 2,
    /// Coded slice data partition B
    CodedSliceDataPartitionB = 3,
    /// Coded slice data partition C
    CodedSliceDataPartitionC = 4,
    /// Coded slice of an IDR picture
    CodedSliceIDR = 5,
    /// Supplemental enhancement information
    SEI = 6,
    /// Sequence parameter set
    SPS = 7,
    /// Picture parameter set
    PPS = 8,
    /// Access unit delimiter
    AccessUnitDelimiter = 9,
    /// End of sequence
    EndOfSequence = 10,
    /// End of stream
    EndOfStream = 11,
    /// Filler data
    FillerData = 12,
}

impl From<u8> for NalUnitType {
    fn from(value: u8) -> Self {
        match value {
            1 => NalUnitType::CodedSliceNonIDR,
            2 => NalUnitType::CodedSliceDataPartitionA,
            3 => NalUnitType::CodedSliceDataPartitionB,
            4 => NalUnitType::CodedSliceDataPartitionC,
            5 => NalUnitType::CodedSliceIDR,
            6 => NalUnitType::SEI,
            7 => NalUnitType::SPS,
            8 => NalUnitType::PPS,
            9 => NalUnitType::AccessUnitDelimiter,
            10 => NalUnitType::EndOfSequence,
            11 => NalUnitType::EndOfStream,
            12 => NalUnitType::FillerData,
            _ => NalUnitType::Unspecified,
        }
    }
}
