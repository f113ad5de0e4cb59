//! Student enrollment, progress, and dashboard endpoints.

// self
use crate::{api::CourseId, http::ApiRequest};

/// `GET student/courses/`.
pub fn enrolled_courses() -> ApiRequest {
	ApiRequest::get("student/courses/")
}

/// `GET student/courses/{id}/progress/`.
pub fn progress(id: &CourseId) -> ApiRequest {
	ApiRequest::get(format!("student/courses/{id}/progress/"))
}

/// `POST enrollment/enroll/{id}/`.
pub fn enroll(id: &CourseId) -> ApiRequest {
	ApiRequest::post(format!("enrollment/enroll/{id}/"))
}

/// `GET dashboard/`.
pub fn dashboard() -> ApiRequest {
	ApiRequest::get("dashboard/")
}
