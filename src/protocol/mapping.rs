//! Translation between wire vocabularies and the local model
//!
//! The status mapping is lossy: every protocol combination
//! other than (available, available) reads back as `Unspecified`.

use crate::domain::{
    Accessibility, AuthenticationMode, CurrentType, EvseStatusType, OpeningTimes, PaymentOption,
    RegularHours as LocalHours, SocketOutlet,
};
use crate::protocol::types::{
    AuthMethod, ChargePointType, Connector, ConnectorFormat, FlagSet, GeneralLocation, HourMinute,
    Hours, MajorStatus, MinorStatus, ParkingRestriction, RegularHours,
};

/// Local status to the (major, minor) pair sent to the remote side.
pub fn to_protocol_status(status: EvseStatusType) -> (MajorStatus, MinorStatus) {
    match status {
        EvseStatusType::Available => (MajorStatus::Available, MinorStatus::Available),
        EvseStatusType::Reserved => (MajorStatus::NotAvailable, MinorStatus::Reserved),
        EvseStatusType::Charging => (MajorStatus::NotAvailable, MinorStatus::Charging),
        EvseStatusType::OutOfService => (MajorStatus::NotAvailable, MinorStatus::OutOfOrder),
        EvseStatusType::Unknown => (MajorStatus::NotAvailable, MinorStatus::Unknown),
        _ => (MajorStatus::Unknown, MinorStatus::Unknown),
    }
}

pub fn from_protocol_status(major: MajorStatus, minor: Option<MinorStatus>) -> EvseStatusType {
    match (major, minor) {
        (MajorStatus::Available, Some(MinorStatus::Available)) => EvseStatusType::Available,
        _ => EvseStatusType::Unspecified,
    }
}

/// Split wire auth methods into local authentication modes and payment options.
pub fn auth_methods_to_local(
    methods: FlagSet<AuthMethod>,
) -> (Vec<AuthenticationMode>, Vec<PaymentOption>) {
    let mut modes = Vec::new();
    let mut payments = Vec::new();
    for method in methods.expand() {
        match method {
            AuthMethod::Public => modes.push(AuthenticationMode::NoAuthentication),
            AuthMethod::LocalKey => modes.push(AuthenticationMode::LocalKey),
            AuthMethod::RfidMifareCls => modes.push(AuthenticationMode::RfidMifareClassic),
            AuthMethod::RfidMifareDes => modes.push(AuthenticationMode::RfidMifareDesfire),
            AuthMethod::RfidCalypso => modes.push(AuthenticationMode::RfidCalypso),
            AuthMethod::Iec15118 => modes.push(AuthenticationMode::PlugAndCharge),
            AuthMethod::DirectCash => payments.push(PaymentOption::Cash),
            AuthMethod::DirectCreditcard => payments.push(PaymentOption::CreditCard),
            AuthMethod::DirectDebitcard => payments.push(PaymentOption::DebitCard),
            AuthMethod::Unknown => {}
        }
    }
    (modes, payments)
}

pub fn auth_methods_from_local(
    modes: &[AuthenticationMode],
    payments: &[PaymentOption],
) -> FlagSet<AuthMethod> {
    let from_modes = modes.iter().map(|mode| match mode {
        AuthenticationMode::NoAuthentication => AuthMethod::Public,
        AuthenticationMode::LocalKey => AuthMethod::LocalKey,
        AuthenticationMode::RfidMifareClassic => AuthMethod::RfidMifareCls,
        AuthenticationMode::RfidMifareDesfire => AuthMethod::RfidMifareDes,
        AuthenticationMode::RfidCalypso => AuthMethod::RfidCalypso,
        AuthenticationMode::PlugAndCharge => AuthMethod::Iec15118,
    });
    let from_payments = payments.iter().map(|payment| match payment {
        PaymentOption::Cash => AuthMethod::DirectCash,
        PaymentOption::CreditCard => AuthMethod::DirectCreditcard,
        PaymentOption::DebitCard => AuthMethod::DirectDebitcard,
    });
    from_modes.chain(from_payments).collect()
}

pub fn accessibility(
    location: GeneralLocation,
    restrictions: FlagSet<ParkingRestriction>,
) -> Accessibility {
    if location == GeneralLocation::Private {
        Accessibility::Private
    } else if restrictions.contains(ParkingRestriction::Customers) {
        Accessibility::Restricted
    } else if location == GeneralLocation::Unknown {
        Accessibility::Unspecified
    } else {
        Accessibility::Public
    }
}

pub fn opening_times_to_local(hours: &Hours) -> OpeningTimes {
    match hours {
        Hours::TwentyFourSeven => OpeningTimes::Open24Hours,
        Hours::Regular(entries) => OpeningTimes::Regular(
            entries
                .iter()
                .map(|h| LocalHours {
                    weekday: h.weekday,
                    begin: h.period_begin.to_naive_time(),
                    end: h.period_end.to_naive_time(),
                })
                .collect(),
        ),
    }
}

pub fn opening_times_from_local(times: &OpeningTimes) -> Hours {
    match times {
        OpeningTimes::Open24Hours => Hours::TwentyFourSeven,
        OpeningTimes::Regular(entries) => Hours::Regular(
            entries
                .iter()
                .map(|h| RegularHours {
                    weekday: h.weekday,
                    period_begin: HourMinute::from_naive_time(h.begin),
                    period_end: HourMinute::from_naive_time(h.end),
                })
                .collect(),
        ),
    }
}

pub fn current_type(kind: ChargePointType) -> CurrentType {
    match kind {
        ChargePointType::Ac => CurrentType::Ac,
        ChargePointType::Dc => CurrentType::Dc,
    }
}

pub fn socket_outlet(connector: &Connector) -> SocketOutlet {
    SocketOutlet {
        plug: connector.standard.clone(),
        cable_attached: connector.format == ConnectorFormat::Cable,
    }
}
