use iced::widget::{column, container, row, text};
use iced::{Alignment, Element, Length, Padding};
use iced_aw::{TabBar, TabLabel};

use hoverclip::views::Route;

#[derive(Debug, Clone)]
pub struct RibbonHint {
	pub icon: &'static str,
	pub label: &'static str,
}

#[derive(Debug, Clone)]
pub struct RibbonGroup {
	pub title: &'static str,
	pub hints: Vec<RibbonHint>,
}

pub fn default_groups(route: Route) -> Vec<RibbonGroup> {
	match route {
		Route::Cube => vec![RibbonGroup {
			title: "Pointer",
			hints: vec![
				RibbonHint {
					icon: "⬚",
					label: "Hover to grow",
				},
				RibbonHint {
					icon: "↺",
					label: "Spins always",
				},
			],
		}],
		Route::Cluster => vec![
			RibbonGroup {
				title: "Camera",
				hints: vec![
					RibbonHint {
						icon: "⟳",
						label: "Drag to orbit",
					},
					RibbonHint {
						icon: "±",
						label: "Wheel to zoom",
					},
				],
			},
			RibbonGroup {
				title: "Clipping",
				hints: vec![RibbonHint {
					icon: "⟂",
					label: "Panel on the right",
				}],
			},
		],
	}
}

pub fn ribbon<'a, Message: Clone + 'static>(
	active: Route,
	on_select: fn(Route) -> Message,
) -> Element<'a, Message> {
	let mut tab_bar = TabBar::new(on_select);
	for route in Route::ALL {
		tab_bar = tab_bar.push(route, TabLabel::Text(route.label().to_string()));
	}
	tab_bar = tab_bar.set_active_tab(&active);

	let groups = default_groups(active)
		.into_iter()
		.map(ribbon_group::<Message>)
		.collect::<Vec<_>>();

	let groups_row = row(groups)
		.spacing(12)
		.align_y(Alignment::Center);

	column![tab_bar, groups_row]
		.spacing(8)
		.padding(Padding::new(8.0))
		.width(Length::Fill)
		.into()
}

fn ribbon_group<'a, Message: 'static>(group: RibbonGroup) -> Element<'a, Message> {
	let hints = group
		.hints
		.into_iter()
		.map(ribbon_hint::<Message>)
		.collect::<Vec<_>>();

	let content = column![
		row(hints)
			.spacing(8)
			.align_y(Alignment::Center),
		text(group.title).size(12),
	]
	.spacing(6)
	.align_x(Alignment::Center);

	container(content)
		.padding(Padding::new(8.0))
		.width(Length::Shrink)
		.into()
}

fn ribbon_hint<'a, Message: 'static>(hint: RibbonHint) -> Element<'a, Message> {
	let content = column![
		text(hint.icon).size(20),
		text(hint.label).size(12),
	]
	.spacing(4)
	.align_x(Alignment::Center);

	container(content)
		.width(Length::Fixed(96.0))
		.height(Length::Fixed(64.0))
		.into()
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn every_route_has_hints() {
		for route in Route::ALL {
			let groups = default_groups(route);
			assert!(!groups.is_empty());
			assert!(groups.iter().all(|g| !g.hints.is_empty()));
		}
	}
}
