//! Course catalog and course content endpoints.

// self
use crate::{_prelude::*, api::CourseId, http::ApiRequest};

/// `GET content/courses/`.
pub fn list() -> ApiRequest {
	ApiRequest::get("content/courses/")
}

/// `GET content/courses/{id}/`.
pub fn get(id: &CourseId) -> ApiRequest {
	ApiRequest::get(format!("content/courses/{id}/"))
}

/// `POST content/courses/` with `course` as the JSON body.
pub fn create<B>(course: &B) -> Result<ApiRequest>
where
	B: ?Sized + Serialize,
{
	ApiRequest::post("content/courses/").json(course)
}

/// `PUT content/courses/{id}/` with `course` as the JSON body.
pub fn update<B>(id: &CourseId, course: &B) -> Result<ApiRequest>
where
	B: ?Sized + Serialize,
{
	ApiRequest::put(format!("content/courses/{id}/")).json(course)
}

/// `DELETE content/courses/{id}/`.
pub fn delete(id: &CourseId) -> ApiRequest {
	ApiRequest::delete(format!("content/courses/{id}/"))
}

/// `GET content/courses/{id}/content/`.
pub fn content(id: &CourseId) -> ApiRequest {
	ApiRequest::get(format!("content/courses/{id}/content/"))
}

/// `POST content/courses/{id}/content/` with `content` as the JSON body.
pub fn upload_content<B>(id: &CourseId, content: &B) -> Result<ApiRequest>
where
	B: ?Sized + Serialize,
{
	ApiRequest::post(format!("content/courses/{id}/content/")).json(content)
}
