use leptos::prelude::*;
use leptos_ui::variants;

// Buttons inside toasts and the session notice. Server pages keep their own `.btn` styles.
variants! {
    Button {
        base: "inline-flex items-center justify-center gap-1.5 whitespace-nowrap rounded-md text-sm font-medium transition-colors disabled:pointer-events-none disabled:opacity-50 [&_svg]:pointer-events-none [&_svg]:shrink-0 [&_svg:not([class*='size-'])]:size-4 outline-none focus-visible:ring-2 focus-visible:ring-offset-1 hover:cursor-pointer select-none",
        variants: {
            variant: {
                Default: "bg-slate-900 text-white hover:bg-slate-800",
                Outline: "border border-slate-300 bg-white text-slate-800 hover:bg-slate-100",
                Ghost: "bg-transparent text-current hover:bg-white/20",
            },
            size: {
                Default: "h-9 px-4",
                Sm: "h-8 px-3",
                Icon: "size-7",
            }
        },
        component: {
            element: button
        }
    }
}
