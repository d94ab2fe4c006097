//! Protocol enumerations.
//!
//! Every enumeration keeps values it does not recognise in an `Unknown`
//! variant so that newer module firmware never makes a frame undecodable.

use std::fmt;

macro_rules! wire_enum {
    (
        $(#[$meta:meta])*
        $name:ident : $repr:ty {
            $( $(#[$vmeta:meta])* $variant:ident = $value:literal ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub enum $name {
            $( $(#[$vmeta])* $variant, )+
            /// A value this driver does not know about.
            Unknown($repr),
        }

        impl $name {
            /// Map a wire value to the enumeration.
            pub fn from_raw(raw: $repr) -> Self {
                match raw {
                    $( $value => $name::$variant, )+
                    other => $name::Unknown(other),
                }
            }

            /// The wire value.
            pub fn raw(self) -> $repr {
                match self {
                    $( $name::$variant => $value, )+
                    $name::Unknown(raw) => raw,
                }
            }
        }

        impl From<$repr> for $name {
            fn from(raw: $repr) -> Self {
                $name::from_raw(raw)
            }
        }
    };
}

wire_enum! {
    /// GAP discoverable modes for `gap_set_mode`.
    GapDiscoverableMode: u8 {
        NonDiscoverable = 0x00,
        LimitedDiscoverable = 0x01,
        GeneralDiscoverable = 0x02,
        Broadcast = 0x03,
        /// Advertise with user data set by `gap_set_adv_data`.
        UserData = 0x04,
        EnhancedBroadcasting = 0x80,
    }
}

wire_enum! {
    /// GAP connectable modes for `gap_set_mode`.
    GapConnectableMode: u8 {
        NonConnectable = 0x00,
        DirectedConnectable = 0x01,
        UndirectedConnectable = 0x02,
        ScannableNonConnectable = 0x03,
    }
}

wire_enum! {
    /// Scan filtering for `gap_discover`.
    GapDiscoverMode: u8 {
        /// Only devices in limited discoverable mode.
        Limited = 0x00,
        /// Devices in limited or general discoverable mode.
        Generic = 0x01,
        /// Every advertiser, discoverable or not.
        Observation = 0x02,
    }
}

wire_enum! {
    BluetoothAddressType: u8 {
        Public = 0x00,
        Random = 0x01,
    }
}

wire_enum! {
    /// Advertising PDU type reported by the scan response event.
    ScanResponseType: u8 {
        ConnectableAdvertisement = 0x00,
        NonConnectableAdvertisement = 0x02,
        ScanResponse = 0x04,
        DiscoverableAdvertisement = 0x06,
    }
}

wire_enum! {
    /// Result codes carried in responses and completion events.
    BgApiResponse: u16 {
        Success = 0x0000,
        InvalidParameter = 0x0180,
        WrongState = 0x0181,
        OutOfMemory = 0x0182,
        NotImplemented = 0x0183,
        InvalidCommand = 0x0184,
        Timeout = 0x0185,
        NotConnected = 0x0186,
        Flow = 0x0187,
        UserAttribute = 0x0188,
        InvalidLicenseKey = 0x0189,
        CommandTooLong = 0x018A,
        OutOfBonds = 0x018B,
        AuthenticationFailure = 0x0205,
        PinOrKeyMissing = 0x0206,
        MemoryCapacityExceeded = 0x0207,
        ConnectionTimeout = 0x0208,
        ConnectionLimitExceeded = 0x0209,
        CommandDisallowed = 0x020C,
        InvalidCommandParameters = 0x0212,
        RemoteUserTerminatedConnection = 0x0213,
        ConnectionTerminatedByLocalHost = 0x0216,
        LlResponseTimeout = 0x0222,
        LlInstantPassed = 0x0228,
        ControllerBusy = 0x023A,
        DirectedAdvertisingTimeout = 0x023C,
        ConnectionTerminatedDueToMicFailure = 0x023D,
        ConnectionFailedToBeEstablished = 0x023E,
        PasskeyEntryFailed = 0x0301,
        OobDataNotAvailable = 0x0302,
        AuthenticationRequirements = 0x0303,
        ConfirmValueFailed = 0x0304,
        PairingNotSupported = 0x0305,
        EncryptionKeySize = 0x0306,
        CommandNotSupported = 0x0307,
        UnspecifiedReason = 0x0308,
        RepeatedAttempts = 0x0309,
        SmpInvalidParameters = 0x030A,
        InvalidHandle = 0x0401,
        ReadNotPermitted = 0x0402,
        WriteNotPermitted = 0x0403,
        InvalidPdu = 0x0404,
        InsufficientAuthentication = 0x0405,
        RequestNotSupported = 0x0406,
        InvalidOffset = 0x0407,
        InsufficientAuthorization = 0x0408,
        PrepareQueueFull = 0x0409,
        AttributeNotFound = 0x040A,
        AttributeNotLong = 0x040B,
        InsufficientEncryptionKeySize = 0x040C,
        InvalidAttributeValueLength = 0x040D,
        UnlikelyError = 0x040E,
        InsufficientEncryption = 0x040F,
        UnsupportedGroupType = 0x0410,
        InsufficientResources = 0x0411,
        ApplicationErrorCodes = 0x0480,
    }
}

impl BgApiResponse {
    pub fn is_success(self) -> bool {
        self == BgApiResponse::Success
    }
}

impl fmt::Display for BgApiResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BgApiResponse::Unknown(raw) => write!(f, "Unknown(0x{raw:04X})"),
            other => write!(f, "{other:?}"),
        }
    }
}

wire_enum! {
    /// Advertising data (EIR) record types.
    EirDataType: u8 {
        Flags = 0x01,
        Uuid16Incomplete = 0x02,
        Uuid16Complete = 0x03,
        Uuid32Incomplete = 0x04,
        Uuid32Complete = 0x05,
        Uuid128Incomplete = 0x06,
        Uuid128Complete = 0x07,
        NameShort = 0x08,
        NameLong = 0x09,
        TxPower = 0x0A,
        DeviceClass = 0x0D,
        SimplePairingHash = 0x0E,
        SimplePairingRandomizer = 0x0F,
        DeviceId = 0x10,
        SecurityManagerOobFlags = 0x11,
        SlaveConnectionIntervalRange = 0x12,
        Solicitation16 = 0x14,
        Solicitation128 = 0x15,
        ServiceData16 = 0x16,
        PublicTargetAddress = 0x17,
        RandomTargetAddress = 0x18,
        Appearance = 0x19,
        AdvertisingInterval = 0x1A,
        ManufacturerSpecific = 0xFF,
    }
}

/// Connection status flags reported by the connection status event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ConnectionStatusFlags(u8);

impl ConnectionStatusFlags {
    /// A connection exists to the remote device.
    pub const CONNECTED: Self = Self(0x01);
    /// The connection is encrypted.
    pub const ENCRYPTED: Self = Self(0x02);
    /// A new connection has been created.
    pub const COMPLETED: Self = Self(0x04);
    /// Connection parameters have changed.
    pub const PARAMETERS_CHANGE: Self = Self(0x08);

    pub const fn from_bits(bits: u8) -> Self {
        Self(bits)
    }

    pub const fn bits(self) -> u8 {
        self.0
    }

    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl std::ops::BitOr for ConnectionStatusFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl fmt::Display for ConnectionStatusFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        const NAMES: [(ConnectionStatusFlags, &str); 4] = [
            (ConnectionStatusFlags::CONNECTED, "CONNECTED"),
            (ConnectionStatusFlags::ENCRYPTED, "ENCRYPTED"),
            (ConnectionStatusFlags::COMPLETED, "COMPLETED"),
            (ConnectionStatusFlags::PARAMETERS_CHANGE, "PARAMETERS_CHANGE"),
        ];
        let mut first = true;
        for (flag, name) in NAMES {
            if self.contains(flag) {
                if !first {
                    f.write_str("|")?;
                }
                f.write_str(name)?;
                first = false;
            }
        }
        if first {
            f.write_str("NONE")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_values_map_to_variants() {
        assert_eq!(
            GapDiscoverableMode::from_raw(0x80),
            GapDiscoverableMode::EnhancedBroadcasting
        );
        assert_eq!(GapDiscoverMode::from_raw(1), GapDiscoverMode::Generic);
        assert_eq!(ScanResponseType::from_raw(4), ScanResponseType::ScanResponse);
        assert_eq!(BgApiResponse::from_raw(0x0186), BgApiResponse::NotConnected);
        assert_eq!(EirDataType::from_raw(0x09), EirDataType::NameLong);
    }

    #[test]
    fn unknown_values_are_preserved() {
        let code = BgApiResponse::from_raw(0x0999);
        assert_eq!(code, BgApiResponse::Unknown(0x0999));
        assert_eq!(code.raw(), 0x0999);
        assert_eq!(code.to_string(), "Unknown(0x0999)");
        assert_eq!(EirDataType::from(0x42).raw(), 0x42);
    }

    #[test]
    fn raw_round_trips_for_known_variants() {
        for mode in [
            GapConnectableMode::NonConnectable,
            GapConnectableMode::DirectedConnectable,
            GapConnectableMode::UndirectedConnectable,
            GapConnectableMode::ScannableNonConnectable,
        ] {
            assert_eq!(GapConnectableMode::from_raw(mode.raw()), mode);
        }
    }

    #[test]
    fn success_code() {
        assert!(BgApiResponse::Success.is_success());
        assert!(!BgApiResponse::WrongState.is_success());
        assert_eq!(BgApiResponse::WrongState.to_string(), "WrongState");
    }

    #[test]
    fn status_flags() {
        let flags = ConnectionStatusFlags::from_bits(0x05);
        assert!(flags.contains(ConnectionStatusFlags::CONNECTED));
        assert!(flags.contains(ConnectionStatusFlags::COMPLETED));
        assert!(!flags.contains(ConnectionStatusFlags::ENCRYPTED));
        assert_eq!(flags.to_string(), "CONNECTED|COMPLETED");
        assert_eq!(ConnectionStatusFlags::default().to_string(), "NONE");
        assert_eq!(
            ConnectionStatusFlags::CONNECTED | ConnectionStatusFlags::ENCRYPTED,
            ConnectionStatusFlags::from_bits(0x03)
        );
    }
}
