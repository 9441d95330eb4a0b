// Fixed four-wheel container addressed by role

use std::ops::{Index, IndexMut};

/// Position of a wheel on the chassis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WheelRole {
    FrontLeft,
    FrontRight,
    BackLeft,
    BackRight,
}

impl WheelRole {
    /// All roles in storage order
    pub const ALL: [WheelRole; 4] = [
        WheelRole::FrontLeft,
        WheelRole::FrontRight,
        WheelRole::BackLeft,
        WheelRole::BackRight,
    ];

    pub fn label(self) -> &'static str {
        match self {
            WheelRole::FrontLeft => "Front left",
            WheelRole::FrontRight => "Front right",
            WheelRole::BackLeft => "Back left",
            WheelRole::BackRight => "Back right",
        }
    }

    /// Wheels on the left side of the chassis
    pub fn is_left(self) -> bool {
        matches!(self, WheelRole::FrontLeft | WheelRole::BackLeft)
    }
}

/// One value per wheel: actuator handles, targets, powers...
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct WheelSet<T> {
    pub front_left: T,
    pub front_right: T,
    pub back_left: T,
    pub back_right: T,
}

impl<T> WheelSet<T> {
    pub fn new(front_left: T, front_right: T, back_left: T, back_right: T) -> Self {
        Self {
            front_left,
            front_right,
            back_left,
            back_right,
        }
    }

    pub fn from_fn(mut f: impl FnMut(WheelRole) -> T) -> Self {
        Self::new(
            f(WheelRole::FrontLeft),
            f(WheelRole::FrontRight),
            f(WheelRole::BackLeft),
            f(WheelRole::BackRight),
        )
    }

    /// Build a set where any wheel may fail
    pub fn try_from_fn<E>(mut f: impl FnMut(WheelRole) -> Result<T, E>) -> Result<Self, E> {
        Ok(Self::new(
            f(WheelRole::FrontLeft)?,
            f(WheelRole::FrontRight)?,
            f(WheelRole::BackLeft)?,
            f(WheelRole::BackRight)?,
        ))
    }

    pub fn iter(&self) -> impl Iterator<Item = (WheelRole, &T)> {
        WheelRole::ALL.into_iter().map(move |role| (role, &self[role]))
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (WheelRole, &mut T)> {
        [
            (WheelRole::FrontLeft, &mut self.front_left),
            (WheelRole::FrontRight, &mut self.front_right),
            (WheelRole::BackLeft, &mut self.back_left),
            (WheelRole::BackRight, &mut self.back_right),
        ]
        .into_iter()
    }

    /// Returns values as array [front_left, front_right, back_left, back_right]
    pub fn into_array(self) -> [T; 4] {
        [
            self.front_left,
            self.front_right,
            self.back_left,
            self.back_right,
        ]
    }
}

impl<T> Index<WheelRole> for WheelSet<T> {
    type Output = T;

    fn index(&self, role: WheelRole) -> &T {
        match role {
            WheelRole::FrontLeft => &self.front_left,
            WheelRole::FrontRight => &self.front_right,
            WheelRole::BackLeft => &self.back_left,
            WheelRole::BackRight => &self.back_right,
        }
    }
}

impl<T> IndexMut<WheelRole> for WheelSet<T> {
    fn index_mut(&mut self, role: WheelRole) -> &mut T {
        match role {
            WheelRole::FrontLeft => &mut self.front_left,
            WheelRole::FrontRight => &mut self.front_right,
            WheelRole::BackLeft => &mut self.back_left,
            WheelRole::BackRight => &mut self.back_right,
        }
    }
}
