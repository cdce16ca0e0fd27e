use crate::api::admin::ConflictQuery;
use crate::api::attendance::{
    AttendanceFilter, AttendanceListResponse, CheckInRequest, CheckInResponse,
};
use crate::api::booking::{BookingFilter, BookingListResponse, CreateBooking};
use crate::api::office::{CreateOffice, CreateQrCode, CreateWifiNetwork};
use crate::api::parking::{CreateReservation, ReservationFilter, ReservationListResponse};
use crate::api::wfh::{
    CreateWfhRequest, CreateWfhResponse, UsageQuery, UsageResponse, WfhFilter, WfhListResponse,
};
use crate::conflict::{ConflictSeverity, RoomConflict};
use crate::model::attendance::{AttendanceRecord, AttendanceStatus};
use crate::model::office_location::OfficeLocation;
use crate::model::parking_reservation::ParkingReservation;
use crate::model::qr_code::QrCode;
use crate::model::room_booking::RoomBooking;
use crate::model::wfh_approval::{Urgency, WfhApproval, WfhStatus};
use crate::model::wifi_network::{SecurityTier, WifiNetwork};
use crate::release::{ReleasedResource, ResourceType};
use crate::verification::{GpsReading, Signals, VerificationMethod, VerificationResult};
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi, openapi};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Presence Engine API",
        version = "1.0.0",
        description = r#"
## Presence Verification & Resource Reconciliation Engine

Employees check in at an office via independent signals (GPS geofence, WiFi
network identity, QR code scan). The engine reconciles those signals into one
confidence-scored presence verdict and manages the shared resources presence
contends over.

### Key Features
- **Multi-method check-in** with per-method confidence scoring and fallback
- **Room bookings** with hard mutual-exclusion over time slots
- **Parking reservations** with per-user and per-spot daily exclusivity
- **Auto-release** of abandoned bookings/reservations on a recurring sweep
- **WFH approvals** with urgency-dependent auto-approval and SLA expiry

### Security
Endpoints are protected using **JWT Bearer authentication**. Administrative
operations require **Admin** or **Manager** roles.

---
Built with **Rust**, **Actix Web**, **SQLx**, and **Utoipa**.
"#,
    ),
    paths(
        crate::api::attendance::check_in,
        crate::api::attendance::check_out,
        crate::api::attendance::today,
        crate::api::attendance::attendance_list,

        crate::api::booking::create_booking,
        crate::api::booking::cancel_booking,
        crate::api::booking::booking_list,

        crate::api::parking::create_reservation,
        crate::api::parking::cancel_reservation,
        crate::api::parking::reservation_list,

        crate::api::wfh::create_request,
        crate::api::wfh::approve_request,
        crate::api::wfh::reject_request,
        crate::api::wfh::usage,
        crate::api::wfh::request_list,
        crate::api::wfh::get_request,

        crate::api::office::create_office,
        crate::api::office::update_office,
        crate::api::office::list_offices,
        crate::api::office::create_wifi,
        crate::api::office::deactivate_wifi,
        crate::api::office::create_qr,
        crate::api::office::list_qr,
        crate::api::office::deactivate_qr,

        crate::api::admin::detect_conflicts,
        crate::api::admin::trigger_auto_release
    ),
    components(
        schemas(
            CheckInRequest,
            CheckInResponse,
            AttendanceFilter,
            AttendanceListResponse,
            AttendanceRecord,
            AttendanceStatus,
            Signals,
            GpsReading,
            VerificationMethod,
            VerificationResult,
            CreateBooking,
            BookingFilter,
            BookingListResponse,
            RoomBooking,
            CreateReservation,
            ReservationFilter,
            ReservationListResponse,
            ParkingReservation,
            CreateWfhRequest,
            CreateWfhResponse,
            UsageQuery,
            UsageResponse,
            WfhFilter,
            WfhListResponse,
            WfhApproval,
            WfhStatus,
            Urgency,
            CreateOffice,
            OfficeLocation,
            CreateWifiNetwork,
            WifiNetwork,
            SecurityTier,
            CreateQrCode,
            QrCode,
            ConflictQuery,
            RoomConflict,
            ConflictSeverity,
            ReleasedResource,
            ResourceType
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Attendance", description = "Check-in/out with multi-method presence verification"),
        (name = "Bookings", description = "Meeting room booking APIs"),
        (name = "Parking", description = "Parking reservation APIs"),
        (name = "WFH", description = "Work-from-home approval workflow APIs"),
        (name = "Offices", description = "Office reference data administration"),
        (name = "Admin", description = "Conflict detection and auto-release administration"),
    )
)]
pub struct ApiDoc;

pub struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}
