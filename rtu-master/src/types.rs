use crate::constants::address;
use crate::error::InvalidRequest;

/// Modbus RTU slave address
///
/// Only unicast addresses (1 to 247) can be constructed. Broadcast (0) never
/// elicits a response and 248 to 255 are reserved.
#[derive(Clone, Copy, Debug, PartialEq, PartialOrd, Ord, Eq, Hash)]
pub struct SlaveAddress {
    value: u8,
}

/// Start and count tuple used when making various requests
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AddressRange {
    /// Starting address of the range
    pub start: u16,
    /// Count of elements in the range
    pub count: u16,
}

/// Value and its address
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Indexed<T> {
    /// Address of the value
    pub index: u16,
    /// Associated value
    pub value: T,
}

/// Collection of values and starting address
///
/// Used when making write multiple requests
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteMultiple<T> {
    /// starting address and count of the values
    pub range: AddressRange,
    /// values to write
    pub values: Vec<T>,
}

impl SlaveAddress {
    /// Create a slave address, rejecting broadcast and reserved values
    pub fn new(value: u8) -> Result<Self, InvalidRequest> {
        if (address::MIN_UNICAST..=address::MAX_UNICAST).contains(&value) {
            Ok(Self { value })
        } else {
            Err(InvalidRequest::BadSlaveAddress(value))
        }
    }

    /// underlying raw value
    pub fn value(self) -> u8 {
        self.value
    }
}

impl TryFrom<u8> for SlaveAddress {
    type Error = InvalidRequest;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl std::fmt::Display for SlaveAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:#04X}", self.value)
    }
}

impl AddressRange {
    /// Create a new address range
    ///
    /// Fails if the count is zero or the last address does not fit in a u16
    pub fn try_from(start: u16, count: u16) -> Result<Self, InvalidRequest> {
        if count == 0 {
            return Err(InvalidRequest::CountOfZero);
        }

        let max_start = u16::MAX - (count - 1);

        if start > max_start {
            return Err(InvalidRequest::AddressOverflow(start, count));
        }

        Ok(Self { start, count })
    }

    /// Iterate over the addresses in the range
    pub fn iter(self) -> AddressIterator {
        AddressIterator::new(self.start, self.count)
    }

    pub(crate) fn validate(self, max: u16) -> Result<Self, InvalidRequest> {
        // fields are public, so re-check what try_from already enforces
        let range = Self::try_from(self.start, self.count)?;
        if range.count > max {
            return Err(InvalidRequest::CountTooLargeForType(range.count, max));
        }
        Ok(range)
    }
}

impl std::fmt::Display for AddressRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "start: {:#06X} qty: {}", self.start, self.count)
    }
}

impl<T> Indexed<T> {
    /// Create a new indexed value
    pub fn new(index: u16, value: T) -> Self {
        Indexed { index, value }
    }
}

impl<T> From<(u16, T)> for Indexed<T> {
    fn from(tuple: (u16, T)) -> Self {
        let (index, value) = tuple;
        Self::new(index, value)
    }
}

impl std::fmt::Display for Indexed<u16> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "idx: {:#06X} value: {:#06X}", self.index, self.value)
    }
}

impl<T> WriteMultiple<T> {
    /// Create a new collection of values starting at the given address
    ///
    /// Fails if the values are empty or the range would overflow
    pub fn from(start: u16, values: Vec<T>) -> Result<Self, InvalidRequest> {
        let count = match u16::try_from(values.len()) {
            Ok(x) => x,
            Err(_) => return Err(InvalidRequest::CountTooBigForU16(values.len())),
        };
        let range = AddressRange::try_from(start, count)?;
        Ok(Self { range, values })
    }

    /// Pair each value with its register address
    pub fn indexed(&self) -> impl Iterator<Item = Indexed<&T>> + '_ {
        self.range
            .iter()
            .zip(self.values.iter())
            .map(|(index, value)| Indexed::new(index, value))
    }

    pub(crate) fn validate(&self, max: u16) -> Result<AddressRange, InvalidRequest> {
        let range = self.range.validate(max)?;
        if self.values.len() != range.count as usize {
            return Err(InvalidRequest::ValueCountMismatch(
                range.count,
                self.values.len(),
            ));
        }
        Ok(range)
    }
}

/// Iterates over the addresses of an [`AddressRange`]
#[derive(Debug, Clone, Copy)]
pub struct AddressIterator {
    current: u16,
    remaining: u16,
}

impl AddressIterator {
    pub(crate) fn new(current: u16, remaining: u16) -> Self {
        Self { current, remaining }
    }
}

impl Iterator for AddressIterator {
    type Item = u16;

    fn next(&mut self) -> Option<Self::Item> {
        match self.remaining.checked_sub(1) {
            Some(remaining) => {
                let ret = self.current;
                self.current = self.current.wrapping_add(1);
                self.remaining = remaining;
                Some(ret)
            }
            None => None,
        }
    }

    // implementing this allows collect to optimize the vector capacity
    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.remaining as usize;
        (remaining, Some(remaining))
    }
}
