//! Departments and clubs.

use crate::context::ServiceContext;
use crate::error::{BusinessError, BusinessResult};
use ssg_core::{Club, Department};
use ssg_persistence::{ClubRepo, DepartmentRepo};
use tracing::info;

pub struct DirectoryService<'a> {
    ctx: &'a ServiceContext,
}

impl<'a> DirectoryService<'a> {
    pub fn new(ctx: &'a ServiceContext) -> Self {
        Self { ctx }
    }

    /// Department with `code`, created if missing
    pub async fn ensure_department(&self, name: &str, code: &str) -> BusinessResult<Department> {
        if name.trim().is_empty() || code.trim().is_empty() {
            return Err(BusinessError::validation("department name and code are required"));
        }
        if let Some(existing) = DepartmentRepo::find_by_code(self.ctx.store(), code.trim()).await? {
            return Ok(existing);
        }

        let department = Department::new(name.trim(), code.trim());
        DepartmentRepo::insert(self.ctx.store(), &department).await?;
        info!(code = %department.code, name = %department.name, "department created");
        Ok(department)
    }

    pub async fn department_by_code(&self, code: &str) -> BusinessResult<Department> {
        DepartmentRepo::find_by_code(self.ctx.store(), code)
            .await?
            .ok_or_else(|| BusinessError::not_found("Department", code))
    }

    pub async fn departments(&self) -> BusinessResult<Vec<Department>> {
        Ok(DepartmentRepo::list(self.ctx.store()).await?)
    }

    pub async fn add_club(&self, name: &str, description: Option<&str>) -> BusinessResult<Club> {
        if name.trim().is_empty() {
            return Err(BusinessError::validation("club name is required"));
        }
        let mut club = Club::new(name.trim());
        club.description = description.map(str::to_string);
        ClubRepo::insert(self.ctx.store(), &club).await?;
        info!(name = %club.name, "club created");
        Ok(club)
    }

    pub async fn clubs(&self) -> BusinessResult<Vec<Club>> {
        Ok(ClubRepo::list(self.ctx.store()).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ssg_persistence::MemoryStore;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_ensure_department_is_idempotent() {
        let ctx = ServiceContext::new(Arc::new(MemoryStore::new()));
        let directory = DirectoryService::new(&ctx);

        let first = directory.ensure_department("Computer Studies", "ccs").await.unwrap();
        let again = directory.ensure_department("Computer Studies", "CCS").await.unwrap();

        assert_eq!(first.id, again.id);
        assert_eq!(directory.departments().await.unwrap().len(), 1);
        assert_eq!(directory.department_by_code("ccs").await.unwrap().id, first.id);
        assert!(directory.department_by_code("xyz").await.is_err());
    }

    #[tokio::test]
    async fn test_clubs() {
        let ctx = ServiceContext::new(Arc::new(MemoryStore::new()));
        let directory = DirectoryService::new(&ctx);

        directory.add_club("Robotics", Some("Builds robots")).await.unwrap();
        directory.add_club("Chess", None).await.unwrap();
        assert!(directory.add_club(" ", None).await.is_err());

        let names: Vec<String> = directory.clubs().await.unwrap().into_iter().map(|c| c.name).collect();
        assert_eq!(names, vec!["Chess", "Robotics"]);
    }
}
