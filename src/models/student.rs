//! Student roster entries.

use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

/// One enrolled student.
///
/// Roster entries are immutable: they are created by class enrollment
/// (external to this core) and never mutated here. Detection confidence is
/// not stored on the student; it lives on the per-capture face match.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Student {
    /// Stable unique identifier.
    pub id: String,
    pub name: String,
    /// Unique within the class.
    pub roll_number: String,
    /// Reference to an enrollment photo, if one exists.
    pub photo: Option<String>,
}

impl Student {
    /// Create a student without a photo reference.
    pub fn new(id: impl Into<String>, name: impl Into<String>, roll_number: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            roll_number: roll_number.into(),
            photo: None,
        }
    }
}

/// The class roster: the fixed set of students a session covers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Roster {
    students: Vec<Student>,
}

impl Roster {
    /// Build a roster, rejecting duplicate ids or roll numbers.
    pub fn new(students: Vec<Student>) -> Result<Self> {
        for (i, student) in students.iter().enumerate() {
            if student.id.trim().is_empty() {
                return Err(AppError::invalid_input("student id cannot be empty"));
            }
            for other in &students[..i] {
                if other.id == student.id {
                    return Err(AppError::invalid_input(format!("duplicate student id: {}", student.id)));
                }
                if other.roll_number == student.roll_number {
                    return Err(AppError::invalid_input(format!(
                        "duplicate roll number: {}",
                        student.roll_number
                    )));
                }
            }
        }
        Ok(Self { students })
    }

    pub fn len(&self) -> usize {
        self.students.len()
    }

    pub fn is_empty(&self) -> bool {
        self.students.is_empty()
    }

    pub fn contains(&self, student_id: &str) -> bool {
        self.students.iter().any(|s| s.id == student_id)
    }

    pub fn get(&self, student_id: &str) -> Option<&Student> {
        self.students.iter().find(|s| s.id == student_id)
    }

    /// Students in enrollment (roll number) order.
    pub fn iter(&self) -> impl Iterator<Item = &Student> {
        self.students.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Vec<Student> {
        vec![
            Student::new("s1", "Asha Verma", "001"),
            Student::new("s2", "Kiran Joshi", "002"),
        ]
    }

    #[test]
    fn test_roster_accepts_unique_students() {
        let roster = Roster::new(sample()).unwrap();
        assert_eq!(roster.len(), 2);
        assert!(roster.contains("s1"));
        assert!(!roster.contains("s3"));
    }

    #[test]
    fn test_roster_rejects_duplicate_id() {
        let mut students = sample();
        students.push(Student::new("s1", "Copy", "003"));
        assert!(matches!(Roster::new(students), Err(AppError::InvalidInput(_))));
    }

    #[test]
    fn test_roster_rejects_duplicate_roll_number() {
        let mut students = sample();
        students.push(Student::new("s3", "Copy", "001"));
        assert!(matches!(Roster::new(students), Err(AppError::InvalidInput(_))));
    }

    #[test]
    fn test_roster_rejects_blank_id() {
        let students = vec![Student::new("  ", "Blank", "001")];
        assert!(Roster::new(students).is_err());
    }
}
