//! Full-stack scenario: a model value is bound into a widget, the resolve
//! pass moves it, and the layout pass consumes the resolved size.

use std::rc::Rc;
use std::sync::LazyLock;

use bindweave::prelude::*;

struct Panel;

static DESIRED_WIDTH: LazyLock<PropertyDefinition> = LazyLock::new(|| {
    PropertyDefinition::create_for::<Panel, f32>("DesiredWidth").expect("definition")
});

static DESIRED_HEIGHT: LazyLock<PropertyDefinition> = LazyLock::new(|| {
    PropertyDefinition::create_for::<Panel, f32>("DesiredHeight").expect("definition")
});

/// A widget whose desired size is driven by bound properties.
struct SizedPanel {
    object: ScopedDependencyObject,
    width: TypedDependencyProperty<f32>,
    height: TypedDependencyProperty<f32>,
}

impl SizedPanel {
    fn new(service: Rc<BindingService>) -> Self {
        Self {
            object: ScopedDependencyObject::new(service),
            width: TypedDependencyProperty::new(0.0),
            height: TypedDependencyProperty::new(0.0),
        }
    }
}

impl Measurable for SizedPanel {
    fn measure(&mut self, available: AvailableSize) -> Size {
        available.constrain(Size::new(self.width.get(), self.height.get()))
    }

    fn arrange(&mut self, _rect: Rect) {}
}

#[test]
fn bound_model_drives_the_layout_pass() {
    let service = Rc::new(BindingService::new());

    // Model side: two properties owned by a "settings" object.
    let settings = ScopedDependencyObject::new(Rc::clone(&service));
    let model_width = TypedDependencyProperty::new(0.0f32);
    let model_height = TypedDependencyProperty::new(0.0f32);
    let width_handle = model_width
        .instance_handle(&settings, &DESIRED_WIDTH)
        .unwrap();
    let height_handle = model_height
        .instance_handle(&settings, &DESIRED_HEIGHT)
        .unwrap();

    // Widget side: panel sizes bound to the model.
    let panel = SizedPanel::new(Rc::clone(&service));
    panel
        .width
        .set_binding(&panel.object, &DESIRED_WIDTH, Binding::new(width_handle))
        .unwrap();
    panel
        .height
        .set_binding(&panel.object, &DESIRED_HEIGHT, Binding::new(height_handle))
        .unwrap();

    model_width.set(&settings, &DESIRED_WIDTH, 120.0).unwrap();
    model_height.set(&settings, &DESIRED_HEIGHT, 40.0).unwrap();
    service.execute_changes().unwrap();

    // Layout consumes the resolved values.
    let mut root = FillLayout::new();
    root.add_child(panel);
    let desired = root.measure(AvailableSize::new(f32::INFINITY, f32::INFINITY));
    assert_eq!(desired, Size::new(120.0, 40.0));

    root.arrange(Rect::from_size(desired));

    // A later model change re-resolves and re-measures.
    model_width.set(&settings, &DESIRED_WIDTH, 200.0).unwrap();
    service.execute_changes().unwrap();
    root.invalidate();
    let desired = root.measure(AvailableSize::new(500.0, f32::INFINITY));
    assert_eq!(desired, Size::new(500.0, 40.0));
}
