use std::str::FromStr;

use anyhow::anyhow;
use taskdeck_shared::TaskStatus;

/// Which dashboard a view is rendered for. Both share one implementation;
/// the differences live in [`SurfaceConfig`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Surface {
    Admin,
    #[default]
    Member,
}

impl Surface {
    pub fn as_str(self) -> &'static str {
        match self {
            Surface::Admin => "admin",
            Surface::Member => "member",
        }
    }
}

impl FromStr for Surface {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "admin" => Ok(Surface::Admin),
            "member" | "" => Ok(Surface::Member),
            other => Err(anyhow!("expected admin or member, got {other:?}")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SurfaceConfig {
    pub surface: Surface,
    pub tabs: Vec<TaskStatus>,
    pub can_delete: bool,
    pub can_assign: bool,
    pub can_manage_areas: bool,
    pub show_grading: bool,
}

impl SurfaceConfig {
    pub fn for_surface(surface: Surface) -> Self {
        match surface {
            Surface::Admin => Self {
                surface,
                tabs: vec![
                    TaskStatus::Todo,
                    TaskStatus::InProgress,
                    TaskStatus::Submitted,
                    TaskStatus::Completed,
                    TaskStatus::Blocked,
                    TaskStatus::Overdue,
                ],
                can_delete: true,
                can_assign: true,
                can_manage_areas: true,
                show_grading: true,
            },
            Surface::Member => Self {
                surface,
                tabs: vec![
                    TaskStatus::Todo,
                    TaskStatus::Upcoming,
                    TaskStatus::InProgress,
                    TaskStatus::Submitted,
                    TaskStatus::Completed,
                    TaskStatus::Overdue,
                ],
                can_delete: false,
                can_assign: false,
                can_manage_areas: false,
                show_grading: false,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn admin_gets_management_actions() {
        let admin = SurfaceConfig::for_surface(Surface::Admin);
        let member = SurfaceConfig::for_surface(Surface::Member);
        assert!(admin.can_delete && admin.can_manage_areas);
        assert!(!member.can_delete && !member.can_assign);
        assert!(admin.tabs.contains(&TaskStatus::Blocked));
        assert!(!member.tabs.contains(&TaskStatus::Blocked));
    }

    #[test]
    fn parses_surface_names() {
        assert_eq!("Admin".parse::<Surface>().unwrap(), Surface::Admin);
        assert_eq!("".parse::<Surface>().unwrap(), Surface::Member);
        assert!("mentor".parse::<Surface>().is_err());
    }
}
